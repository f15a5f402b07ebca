//! In-process store used by the unit and HTTP tests. Mirrors the MySQL
//! implementation's unique keys, upsert and cascade semantics.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::{StreamExt, stream::BoxStream};

use super::{EmployeeStore, IdentityStore, LedgerStore, PolicyStore, StoreError};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance, ReportEntry},
    employee::{Employee, EmployeeChanges, NewEmployee},
    location::{LocationPolicy, PolicySettings},
    role::Role,
    user::User,
};

struct RefreshToken {
    user_id: u64,
    jti: String,
    expires_at: NaiveDateTime,
    revoked: bool,
}

struct ResetToken {
    user_id: u64,
    jti: String,
    expires_at: NaiveDateTime,
    used: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    tick: i64,
    users: Vec<User>,
    employees: Vec<Employee>,
    attendance: Vec<AttendanceRecord>,
    policy: Option<LocationPolicy>,
    tokens: Vec<RefreshToken>,
    resets: Vec<ResetToken>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so "most recent" is well defined.
    fn now(&mut self) -> NaiveDateTime {
        self.tick += 1;
        Utc::now().naive_utc() + Duration::microseconds(self.tick)
    }

    fn email_taken(&self, email: &str, except_user: Option<u64>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except_user)
            || self
                .employees
                .iter()
                .any(|e| e.email == email && Some(e.user_id) != except_user)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row without the same-day upsert, to simulate legacy data.
    pub fn push_raw_attendance(&self, entry: &NewAttendance) -> AttendanceRecord {
        let mut state = self.state.lock().unwrap();
        let record = AttendanceRecord {
            id: state.next_id(),
            employee_id: entry.employee_id,
            status: entry.status,
            date: entry.date,
            time_in: entry.time_in,
            time_out: entry.time_out,
            photo: entry.photo.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            reason: entry.reason.clone(),
            created_at: state.now(),
        };
        state.attendance.push(record.clone());
        record
    }

    pub fn attendance_count(&self) -> usize {
        self.state.lock().unwrap().attendance.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user(&self, user_id: u64) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().email_taken(email, None))
    }

    async fn create_admin(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(email.to_string()));
        }
        let user = User {
            id: state.next_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::Admin,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn store_reset_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for reset in state.resets.iter_mut().filter(|r| r.user_id == user_id) {
            reset.used = true;
        }
        state.resets.push(ResetToken {
            user_id,
            jti: jti.to_string(),
            expires_at,
            used: false,
        });
        Ok(())
    }

    async fn reset_password(
        &self,
        user_id: u64,
        jti: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now().naive_utc();
        let Some(reset) = state.resets.iter_mut().find(|r| {
            r.jti == jti && r.user_id == user_id && !r.used && r.expires_at > now
        }) else {
            return Ok(false);
        };
        reset.used = true;

        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        for token in state.tokens.iter_mut().filter(|t| t.user_id == user_id) {
            token.revoked = true;
        }
        Ok(true)
    }

    async fn delete_identity(&self, user_id: u64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let employee_ids: Vec<u64> = state
            .employees
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.id)
            .collect();
        state
            .attendance
            .retain(|a| !employee_ids.contains(&a.employee_id));
        state.employees.retain(|e| e.user_id != user_id);
        state.tokens.retain(|t| t.user_id != user_id);
        state.resets.retain(|r| r.user_id != user_id);
        let before = state.users.len();
        state.users.retain(|u| u.id != user_id);
        Ok(state.users.len() < before)
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.state.lock().unwrap().tokens.push(RefreshToken {
            user_id,
            jti: jti.to_string(),
            expires_at,
            revoked: false,
        });
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: u64,
        old_jti: &str,
        new_jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now().naive_utc();
        let Some(old) = state.tokens.iter_mut().find(|t| {
            t.jti == old_jti && t.user_id == user_id && !t.revoked && t.expires_at > now
        }) else {
            return Ok(false);
        };
        old.revoked = true;
        state.tokens.push(RefreshToken {
            user_id,
            jti: new_jti.to_string(),
            expires_at,
            revoked: false,
        });
        Ok(true)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for token in state.tokens.iter_mut().filter(|t| t.jti == jti) {
            token.revoked = true;
        }
        Ok(())
    }

    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>> {
        let state = self.state.lock().unwrap();
        let emails: Vec<Result<String, StoreError>> = state
            .users
            .iter()
            .map(|u| u.email.clone())
            .chain(state.employees.iter().map(|e| e.email.clone()))
            .map(Ok)
            .collect();
        futures::stream::iter(emails).boxed()
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn create_employee(
        &self,
        password_hash: &str,
        employee: &NewEmployee,
    ) -> Result<Employee, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.email_taken(&employee.email, None) {
            return Err(StoreError::Duplicate(employee.email.clone()));
        }
        let user = User {
            id: state.next_id(),
            email: employee.email.clone(),
            password_hash: password_hash.to_string(),
            role: Role::Regular,
        };
        let profile = Employee {
            id: state.next_id(),
            user_id: user.id,
            name: employee.name.clone(),
            gender: employee.gender.clone(),
            email: employee.email.clone(),
            phone_number: employee.phone_number.clone(),
            photo_profile: employee.photo_profile.clone(),
        };
        state.users.push(user);
        state.employees.push(profile.clone());
        Ok(profile)
    }

    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn find_employee_by_user(&self, user_id: u64) -> Result<Option<Employee>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.employees.iter().find(|e| e.user_id == user_id).cloned())
    }

    async fn list_employees(&self, limit: u64, offset: u64) -> Result<Vec<Employee>, StoreError> {
        let mut employees = self.state.lock().unwrap().employees.clone();
        employees.sort_by_key(|e| e.id);
        Ok(employees
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_employees(&self) -> Result<u64, StoreError> {
        Ok(self.state.lock().unwrap().employees.len() as u64)
    }

    async fn update_employee(
        &self,
        employee_id: u64,
        changes: &EmployeeChanges,
    ) -> Result<Option<Employee>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(user_id) = state
            .employees
            .iter()
            .find(|e| e.id == employee_id)
            .map(|e| e.user_id)
        else {
            return Ok(None);
        };
        if state.email_taken(&changes.email, Some(user_id)) {
            return Err(StoreError::Duplicate(changes.email.clone()));
        }

        let employee = state
            .employees
            .iter_mut()
            .find(|e| e.id == employee_id)
            .expect("employee looked up above");
        employee.name = changes.name.clone();
        employee.email = changes.email.clone();
        if let Some(gender) = &changes.gender {
            employee.gender = gender.clone();
        }
        if let Some(phone) = &changes.phone_number {
            employee.phone_number = phone.clone();
        }
        if let Some(photo) = &changes.photo_profile {
            employee.photo_profile = Some(photo.clone());
        }
        let updated = employee.clone();

        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.email = changes.email.clone();
        }
        Ok(Some(updated))
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn active_policy(&self) -> Result<Option<LocationPolicy>, StoreError> {
        Ok(self.state.lock().unwrap().policy.clone())
    }

    async fn replace_policy(&self, settings: &PolicySettings) -> Result<LocationPolicy, StoreError> {
        let mut state = self.state.lock().unwrap();
        let policy = LocationPolicy {
            latitude: settings.latitude,
            longitude: settings.longitude,
            radius_m: settings.radius_m,
            clock_in: settings.clock_in,
            clock_out: settings.clock_out,
            updated_at: state.now(),
        };
        state.policy = Some(policy.clone());
        Ok(policy)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn upsert_attendance(
        &self,
        entry: &NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.employees.iter().any(|e| e.id == entry.employee_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        let created_at = state.now();
        let existing = state
            .attendance
            .iter()
            .position(|a| a.employee_id == entry.employee_id && a.date == entry.date);
        let id = match existing {
            Some(index) => state.attendance.remove(index).id,
            None => state.next_id(),
        };
        let record = AttendanceRecord {
            id,
            employee_id: entry.employee_id,
            status: entry.status,
            date: entry.date,
            time_in: entry.time_in,
            time_out: entry.time_out,
            photo: entry.photo.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            reason: entry.reason.clone(),
            created_at,
        };
        state.attendance.push(record.clone());
        Ok(record)
    }

    async fn attendance_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|a| a.employee_id == employee_id && a.date == date)
            .cloned()
            .collect())
    }

    async fn attendance_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .iter()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by_key(|a| (a.date, a.id));
        Ok(records)
    }

    async fn set_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time_out: NaiveTime,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .attendance
            .iter_mut()
            .filter(|a| {
                a.employee_id == employee_id
                    && a.date == date
                    && a.status == AttendanceStatus::Present
            })
            .max_by_key(|a| (a.created_at, a.id));
        Ok(record.map(|a| {
            a.time_out = Some(time_out);
            a.clone()
        }))
    }

    fn report_entries(&self) -> BoxStream<'_, Result<ReportEntry, StoreError>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<ReportEntry> = state
            .attendance
            .iter()
            .filter_map(|a| {
                state
                    .employees
                    .iter()
                    .find(|e| e.id == a.employee_id)
                    .map(|e| ReportEntry {
                        employee_name: e.name.clone(),
                        record: a.clone(),
                    })
            })
            .collect();
        entries.sort_by_key(|r| (r.record.date, r.record.employee_id, r.record.id));
        futures::stream::iter(entries.into_iter().map(Ok)).boxed()
    }
}
