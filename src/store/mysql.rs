use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::{StreamExt, stream::BoxStream};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{EmployeeStore, IdentityStore, LedgerStore, PolicyStore, StoreError};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance, ReportEntry},
    employee::{Employee, EmployeeChanges, NewEmployee},
    location::{LocationPolicy, PolicySettings},
    role::Role,
    user::User,
};

const ATTENDANCE_COLUMNS: &str = "a.id, a.employee_id, a.status, a.date, a.time_in, a.time_out, \
     a.photo, a.latitude, a.longitude, a.reason, a.created_at";

/// Store backed by the MySQL pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    email: String,
    password_hash: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            role: Role::from_db(&r.role),
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    status: String,
    date: NaiveDate,
    time_in: NaiveTime,
    time_out: Option<NaiveTime>,
    photo: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    reason: String,
    created_at: NaiveDateTime,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(r: AttendanceRow) -> Self {
        Self {
            id: r.id,
            employee_id: r.employee_id,
            status: AttendanceStatus::from_db(&r.status),
            date: r.date,
            time_in: r.time_in,
            time_out: r.time_out,
            photo: r.photo,
            latitude: r.latitude,
            longitude: r.longitude,
            reason: r.reason,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReportRow {
    employee_name: String,
    #[sqlx(flatten)]
    record: AttendanceRow,
}

#[derive(FromRow)]
struct PolicyRow {
    latitude: f64,
    longitude: f64,
    radius_m: f64,
    clock_in: NaiveTime,
    clock_out: NaiveTime,
    updated_at: NaiveDateTime,
}

impl From<PolicyRow> for LocationPolicy {
    fn from(r: PolicyRow) -> Self {
        Self {
            latitude: r.latitude,
            longitude: r.longitude,
            radius_m: r.radius_m,
            clock_in: r.clock_in,
            clock_out: r.clock_out,
            updated_at: r.updated_at,
        }
    }
}

/// Maps unique-key violations to `StoreError::Duplicate`.
fn map_unique(e: sqlx::Error, value: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(value.to_string());
        }
    }
    StoreError::Database(e)
}

async fn fetch_day_record(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance a \
         WHERE a.employee_id = ? AND a.date = ? \
         ORDER BY a.created_at DESC, a.id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Into::into))
}

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn find_user(&self, user_id: u64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CAST(
                EXISTS(SELECT 1 FROM users WHERE email = ?)
                OR EXISTS(SELECT 1 FROM employees WHERE email = ?)
            AS SIGNED)
            "#,
        )
        .bind(email)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn create_admin(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let result = sqlx::query("INSERT INTO users (email, password_hash, role) VALUES (?, ?, ?)")
            .bind(email)
            .bind(password_hash)
            .bind(Role::Admin.as_ref())
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, email))?;

        Ok(User {
            id: result.last_insert_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::Admin,
        })
    }

    async fn store_reset_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE password_resets SET used = 1 WHERE user_id = ? AND used = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO password_resets (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        user_id: u64,
        jti: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let spent = sqlx::query(
            r#"
            UPDATE password_resets
            SET used = 1
            WHERE jti = ? AND user_id = ? AND used = 0 AND expires_at > UTC_TIMESTAMP()
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if spent.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let revoked =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;

        debug!(
            user_id,
            refresh_tokens_revoked = revoked.rows_affected(),
            "Password reset applied"
        );
        Ok(true)
    }

    async fn delete_identity(&self, user_id: u64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let attendance = sqlx::query(
            r#"
            DELETE a FROM attendance a
            JOIN employees e ON e.id = a.employee_id
            WHERE e.user_id = ?
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM employees WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM password_resets WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let user = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            user_id,
            attendance_rows = attendance.rows_affected(),
            "Identity deleted"
        );
        Ok(user.rows_affected() > 0)
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: u64,
        old_jti: &str,
        new_jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = 1
            WHERE jti = ? AND user_id = ? AND revoked = 0 AND expires_at > UTC_TIMESTAMP()
            "#,
        )
        .bind(old_jti)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(new_jti)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users UNION SELECT email FROM employees")
            .fetch(&self.pool)
            .map(|row| row.map_err(StoreError::from))
            .boxed()
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn create_employee(
        &self,
        password_hash: &str,
        employee: &NewEmployee,
    ) -> Result<Employee, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query("INSERT INTO users (email, password_hash, role) VALUES (?, ?, ?)")
            .bind(&employee.email)
            .bind(password_hash)
            .bind(Role::Regular.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, &employee.email))?;
        let user_id = user.last_insert_id();

        let profile = sqlx::query(
            r#"
            INSERT INTO employees (user_id, name, gender, email, phone_number, photo_profile)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&employee.name)
        .bind(&employee.gender)
        .bind(&employee.email)
        .bind(&employee.phone_number)
        .bind(&employee.photo_profile)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, &employee.email))?;

        tx.commit().await?;

        Ok(Employee {
            id: profile.last_insert_id(),
            user_id,
            name: employee.name.clone(),
            gender: employee.gender.clone(),
            email: employee.email.clone(),
            phone_number: employee.phone_number.clone(),
            photo_profile: employee.photo_profile.clone(),
        })
    }

    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, name, gender, email, phone_number, photo_profile
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn find_employee_by_user(&self, user_id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, name, gender, email, phone_number, photo_profile
            FROM employees
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn list_employees(&self, limit: u64, offset: u64) -> Result<Vec<Employee>, StoreError> {
        debug!(limit, offset, "Fetching employees");
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, name, gender, email, phone_number, photo_profile
            FROM employees
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn count_employees(&self) -> Result<u64, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn update_employee(
        &self,
        employee_id: u64,
        changes: &EmployeeChanges,
    ) -> Result<Option<Employee>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, user_id, name, gender, email, phone_number, photo_profile
            FROM employees
            WHERE id = ?
            FOR UPDATE
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        let updated = Employee {
            id: current.id,
            user_id: current.user_id,
            name: changes.name.clone(),
            email: changes.email.clone(),
            gender: changes.gender.clone().unwrap_or(current.gender),
            phone_number: changes.phone_number.clone().unwrap_or(current.phone_number),
            photo_profile: changes.photo_profile.clone().or(current.photo_profile),
        };

        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, email = ?, gender = ?, phone_number = ?, photo_profile = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.gender)
        .bind(&updated.phone_number)
        .bind(&updated.photo_profile)
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, &updated.email))?;

        // The login email follows the contact email.
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(&updated.email)
            .bind(updated.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique(e, &updated.email))?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}

#[async_trait]
impl PolicyStore for MySqlStore {
    async fn active_policy(&self) -> Result<Option<LocationPolicy>, StoreError> {
        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT latitude, longitude, radius_m, clock_in, clock_out, updated_at
            FROM location_policy
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn replace_policy(&self, settings: &PolicySettings) -> Result<LocationPolicy, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO location_policy (id, latitude, longitude, radius_m, clock_in, clock_out)
            VALUES (1, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                latitude = VALUES(latitude),
                longitude = VALUES(longitude),
                radius_m = VALUES(radius_m),
                clock_in = VALUES(clock_in),
                clock_out = VALUES(clock_out),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(settings.latitude)
        .bind(settings.longitude)
        .bind(settings.radius_m)
        .bind(settings.clock_in)
        .bind(settings.clock_out)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT latitude, longitude, radius_m, clock_in, clock_out, updated_at
            FROM location_policy
            WHERE id = 1
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

#[async_trait]
impl LedgerStore for MySqlStore {
    async fn upsert_attendance(
        &self,
        entry: &NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, status, date, time_in, time_out, photo, latitude, longitude, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                time_in = VALUES(time_in),
                time_out = VALUES(time_out),
                photo = VALUES(photo),
                latitude = VALUES(latitude),
                longitude = VALUES(longitude),
                reason = VALUES(reason),
                created_at = CURRENT_TIMESTAMP(6)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.status.as_ref())
        .bind(entry.date)
        .bind(entry.time_in)
        .bind(entry.time_out)
        .bind(&entry.photo)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(&entry.reason)
        .execute(&mut *tx)
        .await?;

        let record = fetch_day_record(&mut tx, entry.employee_id, entry.date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        tx.commit().await?;
        Ok(record)
    }

    async fn attendance_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance a \
             WHERE a.employee_id = ? AND a.date = ? ORDER BY a.id"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn attendance_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance a \
             WHERE a.employee_id = ? ORDER BY a.date, a.id"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time_out: NaiveTime,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let present_id = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id FROM attendance
            WHERE employee_id = ? AND date = ? AND status = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(AttendanceStatus::Present.as_ref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = present_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE attendance SET time_out = ? WHERE id = ?")
            .bind(time_out)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let record = fetch_day_record(&mut tx, employee_id, date).await?;
        tx.commit().await?;
        Ok(record)
    }

    fn report_entries(&self) -> BoxStream<'_, Result<ReportEntry, StoreError>> {
        sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT e.name AS employee_name,
                   a.id, a.employee_id, a.status, a.date, a.time_in, a.time_out,
                   a.photo, a.latitude, a.longitude, a.reason, a.created_at
            FROM attendance a
            JOIN employees e ON e.id = a.employee_id
            ORDER BY a.date, a.employee_id, a.id
            "#,
        )
        .fetch(&self.pool)
        .map(|row| {
            row.map(|r| ReportEntry {
                employee_name: r.employee_name,
                record: r.record.into(),
            })
            .map_err(StoreError::from)
        })
        .boxed()
    }
}
