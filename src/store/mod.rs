//! Persistence seams. Every write that touches more than one row runs in a
//! single transaction inside the implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::BoxStream;

use crate::model::{
    attendance::{AttendanceRecord, NewAttendance, ReportEntry},
    employee::{Employee, EmployeeChanges, NewEmployee},
    location::{LocationPolicy, PolicySettings},
    user::User,
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key was violated. Carries the offending value.
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user(&self, user_id: u64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Creates an administrator identity without an employee profile.
    async fn create_admin(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Records an issued reset token. Earlier unused tokens of the same user
    /// stop working.
    async fn store_reset_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    /// Spends the reset token, sets the new password and revokes every refresh
    /// token of the user in one transaction. Returns false when the token is
    /// unknown, already used, expired or owned by another user.
    async fn reset_password(
        &self,
        user_id: u64,
        jti: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Removes the identity together with its employee profile, attendance
    /// rows, refresh tokens and reset tokens. Returns false when nothing was deleted.
    async fn delete_identity(&self, user_id: u64) -> Result<bool, StoreError>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    /// Revokes `old_jti` and records `new_jti` atomically. Returns false when
    /// the old token is unknown, revoked or owned by another user.
    async fn rotate_refresh_token(
        &self,
        user_id: u64,
        old_jti: &str,
        new_jti: &str,
        expires_at: NaiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn revoke_refresh_token(&self, jti: &str) -> Result<(), StoreError>;

    /// Every registered email, identities and employee contacts alike.
    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Creates a regular identity and its employee profile in one transaction.
    async fn create_employee(
        &self,
        password_hash: &str,
        employee: &NewEmployee,
    ) -> Result<Employee, StoreError>;

    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, StoreError>;

    async fn find_employee_by_user(&self, user_id: u64) -> Result<Option<Employee>, StoreError>;

    /// One page of employees ordered by id.
    async fn list_employees(&self, limit: u64, offset: u64) -> Result<Vec<Employee>, StoreError>;

    async fn count_employees(&self) -> Result<u64, StoreError>;

    async fn update_employee(
        &self,
        employee_id: u64,
        changes: &EmployeeChanges,
    ) -> Result<Option<Employee>, StoreError>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn active_policy(&self) -> Result<Option<LocationPolicy>, StoreError>;

    /// Replaces the single policy row.
    async fn replace_policy(&self, settings: &PolicySettings) -> Result<LocationPolicy, StoreError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Writes the day's record for the employee, replacing an existing row for
    /// the same date.
    async fn upsert_attendance(&self, entry: &NewAttendance)
    -> Result<AttendanceRecord, StoreError>;

    async fn attendance_for_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn attendance_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Sets the time-out on the day's presence record, if there is one.
    async fn set_time_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time_out: NaiveTime,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// All ledger rows joined with employee names, ordered by date, employee
    /// id and record id.
    fn report_entries(&self) -> BoxStream<'_, Result<ReportEntry, StoreError>>;
}

pub trait Store: IdentityStore + EmployeeStore + PolicyStore + LedgerStore {}

impl<T> Store for T where T: IdentityStore + EmployeeStore + PolicyStore + LedgerStore {}
