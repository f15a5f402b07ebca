//! Administrator management of employees and their identities.

use serde::Deserialize;
use tracing::{debug, error, info};
use utoipa::ToSchema;

use crate::{
    auth::password::hash_password,
    error::AttendanceError,
    model::employee::{Employee, EmployeeChanges, NewEmployee},
    store::{Store, StoreError},
    utils::email_registry::{EmailRegistry, looks_like_email},
};

const UNSPECIFIED_GENDER: &str = "unspecified";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Siti Rahma")]
    pub name: Option<String>,
    #[schema(example = "siti@company.com")]
    pub email: Option<String>,
    #[schema(example = "s3cret!")]
    pub password: Option<String>,
    #[schema(example = "+628123456789")]
    pub phone_number: Option<String>,
    #[schema(example = "female", nullable = true)]
    pub gender: Option<String>,
    #[schema(nullable = true)]
    pub photo_profile: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[schema(example = "Siti Rahma")]
    pub name: Option<String>,
    #[schema(example = "siti.rahma@company.com")]
    pub email: Option<String>,
    #[schema(nullable = true)]
    pub phone_number: Option<String>,
    #[schema(nullable = true)]
    pub gender: Option<String>,
    #[schema(nullable = true)]
    pub photo_profile: Option<String>,
}

fn required(field: &'static str, value: Option<&str>) -> Result<String, AttendanceError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AttendanceError::MissingField(field))
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn checked_email(value: Option<&str>) -> Result<String, AttendanceError> {
    let email = required("email", value)?.to_lowercase();
    if !looks_like_email(&email) {
        return Err(AttendanceError::MalformedInput {
            field: "email",
            reason: "is not a valid email address".into(),
        });
    }
    Ok(email)
}

fn conflict_on_duplicate(err: StoreError) -> AttendanceError {
    match err {
        StoreError::Duplicate(_) => AttendanceError::Conflict("email"),
        other => AttendanceError::Storage(other),
    }
}

/// Creates the identity and its employee profile together.
pub async fn create_employee(
    store: &dyn Store,
    registry: &EmailRegistry,
    input: &CreateEmployee,
) -> Result<Employee, AttendanceError> {
    let name = required("name", input.name.as_deref())?;
    let email = checked_email(input.email.as_deref())?;
    let password = input
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(AttendanceError::MissingField("password"))?;
    let phone_number = required("phone_number", input.phone_number.as_deref())?;

    if !registry.is_available(&email, store).await? {
        info!(%email, "Employee creation rejected: email taken");
        return Err(AttendanceError::Conflict("email"));
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AttendanceError::Credential
    })?;

    let employee = store
        .create_employee(
            &password_hash,
            &NewEmployee {
                name,
                gender: optional(input.gender.as_deref())
                    .unwrap_or_else(|| UNSPECIFIED_GENDER.to_string()),
                email,
                phone_number,
                photo_profile: optional(input.photo_profile.as_deref()),
            },
        )
        .await
        .map_err(conflict_on_duplicate)?;

    registry.mark_taken(&employee.email).await;
    info!(employee_id = employee.id, user_id = employee.user_id, "Employee created");
    Ok(employee)
}

pub async fn update_employee(
    store: &dyn Store,
    registry: &EmailRegistry,
    employee_id: u64,
    input: &UpdateEmployee,
) -> Result<Employee, AttendanceError> {
    let name = required("name", input.name.as_deref())?;
    let email = checked_email(input.email.as_deref())?;

    let current = get_employee(store, employee_id).await?;
    let email_changed = !current.email.eq_ignore_ascii_case(&email);
    if email_changed && !registry.is_available(&email, store).await? {
        return Err(AttendanceError::Conflict("email"));
    }

    let updated = store
        .update_employee(
            employee_id,
            &EmployeeChanges {
                name,
                email,
                gender: optional(input.gender.as_deref()),
                phone_number: optional(input.phone_number.as_deref()),
                photo_profile: optional(input.photo_profile.as_deref()),
            },
        )
        .await
        .map_err(conflict_on_duplicate)?
        .ok_or(AttendanceError::NotFound("employee"))?;

    if email_changed {
        registry.release(&current.email).await;
        registry.mark_taken(&updated.email).await;
    }
    info!(employee_id, "Employee updated");
    Ok(updated)
}

/// Deletes the employee's identity; the profile, its attendance rows and
/// refresh tokens go with it.
pub async fn delete_employee(
    store: &dyn Store,
    registry: &EmailRegistry,
    employee_id: u64,
) -> Result<(), AttendanceError> {
    let employee = get_employee(store, employee_id).await?;
    let user = store.find_user(employee.user_id).await?;

    if !store.delete_identity(employee.user_id).await? {
        return Err(AttendanceError::NotFound("employee"));
    }

    registry.release(&employee.email).await;
    if let Some(user) = user.filter(|u| !u.email.eq_ignore_ascii_case(&employee.email)) {
        registry.release(&user.email).await;
    }
    info!(employee_id, user_id = employee.user_id, "Employee deleted");
    Ok(())
}

pub async fn get_employee(store: &dyn Store, employee_id: u64) -> Result<Employee, AttendanceError> {
    store
        .find_employee(employee_id)
        .await?
        .ok_or(AttendanceError::NotFound("employee"))
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized page and page size plus the row offset they address.
pub fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = u64::from(page - 1).saturating_mul(u64::from(per_page));
    (page, per_page, offset)
}

/// One page of employees and the total count.
pub async fn list_employees(
    store: &dyn Store,
    per_page: u32,
    offset: u64,
) -> Result<(Vec<Employee>, u64), AttendanceError> {
    let total = store.count_employees().await?;
    if offset >= total {
        return Ok((Vec::new(), total));
    }
    let employees = store.list_employees(u64::from(per_page), offset).await?;
    Ok((employees, total))
}

/// Creates the administrator identity unless the email is already registered.
/// Returns whether an identity was created.
pub async fn ensure_admin(
    store: &dyn Store,
    registry: &EmailRegistry,
    email: &str,
    password: &str,
) -> Result<bool, AttendanceError> {
    let email = checked_email(Some(email))?;
    if store.find_user_by_email(&email).await?.is_some() {
        debug!(%email, "Bootstrap admin already present");
        return Ok(false);
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AttendanceError::Credential
    })?;
    let user = store
        .create_admin(&email, &password_hash)
        .await
        .map_err(conflict_on_duplicate)?;

    registry.mark_taken(&user.email).await;
    info!(user_id = user.id, "Bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::attendance::{AttendanceStatus, NOT_APPLICABLE, NewAttendance},
        store::{IdentityStore, LedgerStore, memory::MemoryStore},
    };
    use chrono::{NaiveDate, NaiveTime};

    fn siti() -> CreateEmployee {
        CreateEmployee {
            name: Some("Siti Rahma".into()),
            email: Some("Siti@Company.com".into()),
            password: Some("s3cret!".into()),
            phone_number: Some("0812".into()),
            gender: None,
            photo_profile: None,
        }
    }

    #[actix_web::test]
    async fn creates_identity_and_profile() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();

        let employee = create_employee(&store, &registry, &siti()).await.unwrap();

        assert_eq!(employee.email, "siti@company.com");
        assert_eq!(employee.gender, UNSPECIFIED_GENDER);
        let user = store.find_user(employee.user_id).await.unwrap().unwrap();
        assert_ne!(user.password_hash, "s3cret!");
        assert!(registry.might_exist("siti@company.com"));
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        create_employee(&store, &registry, &siti()).await.unwrap();

        let err = create_employee(&store, &registry, &siti()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict("email")));

        // The unique key still catches what a cold registry misses.
        let err = create_employee(&store, &EmailRegistry::new(), &siti())
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict("email")));
    }

    #[actix_web::test]
    async fn required_fields_are_checked() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();

        let mut input = siti();
        input.phone_number = Some("  ".into());
        let err = create_employee(&store, &registry, &input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::MissingField("phone_number")));

        let mut input = siti();
        input.email = Some("not-an-email".into());
        let err = create_employee(&store, &registry, &input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedInput { field: "email", .. }));
    }

    #[actix_web::test]
    async fn update_moves_email_in_registry() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        let employee = create_employee(&store, &registry, &siti()).await.unwrap();

        let updated = update_employee(
            &store,
            &registry,
            employee.id,
            &UpdateEmployee {
                name: Some("Siti R.".into()),
                email: Some("siti.r@company.com".into()),
                phone_number: Some("0813".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Siti R.");
        assert_eq!(updated.phone_number, "0813");
        assert!(registry.is_available("siti@company.com", &store).await.unwrap());
        assert!(!registry.is_available("siti.r@company.com", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn update_requires_name_and_email() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        let employee = create_employee(&store, &registry, &siti()).await.unwrap();

        let err = update_employee(
            &store,
            &registry,
            employee.id,
            &UpdateEmployee {
                email: Some("x@company.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::MissingField("name")));
    }

    #[actix_web::test]
    async fn delete_cascades_to_profile_and_attendance() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        let employee = create_employee(&store, &registry, &siti()).await.unwrap();
        store
            .upsert_attendance(&NewAttendance {
                employee_id: employee.id,
                status: AttendanceStatus::Present,
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                time_in: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                time_out: None,
                photo: None,
                latitude: Some(0.0),
                longitude: Some(0.0),
                reason: NOT_APPLICABLE.into(),
            })
            .await
            .unwrap();

        delete_employee(&store, &registry, employee.id).await.unwrap();

        assert!(store.find_user(employee.user_id).await.unwrap().is_none());
        assert!(matches!(
            get_employee(&store, employee.id).await,
            Err(AttendanceError::NotFound("employee"))
        ));
        assert_eq!(store.attendance_count(), 0);
        assert!(registry.is_available("siti@company.com", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn bootstrap_admin_is_created_once() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();

        assert!(ensure_admin(&store, &registry, "Admin@Company.com", "pw").await.unwrap());
        assert!(!ensure_admin(&store, &registry, "admin@company.com", "pw").await.unwrap());

        let admin = store
            .find_user_by_email("admin@company.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, crate::model::role::Role::Admin);
    }

    #[actix_web::test]
    async fn deleting_unknown_employee_is_not_found() {
        let store = MemoryStore::new();
        let err = delete_employee(&store, &EmailRegistry::new(), 42)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound("employee")));
    }

    #[test]
    fn page_window_never_overflows() {
        assert_eq!(page_window(None, None), (1, 20, 0));
        assert_eq!(page_window(Some(0), Some(500)), (1, 100, 0));
        assert_eq!(page_window(Some(3), Some(10)), (3, 10, 20));

        let (page, per_page, offset) = page_window(Some(u32::MAX), Some(100));
        assert_eq!((page, per_page), (u32::MAX, 100));
        assert_eq!(offset, (u64::from(u32::MAX) - 1) * 100);
    }

    #[actix_web::test]
    async fn lists_one_page_with_the_total() {
        let store = MemoryStore::new();
        let registry = EmailRegistry::new();
        for i in 0..3 {
            let mut employee = siti();
            employee.email = Some(format!("staff{i}@company.com"));
            create_employee(&store, &registry, &employee).await.unwrap();
        }

        let (page, total) = list_employees(&store, 2, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].email, "staff2@company.com");

        let (_, _, offset) = page_window(Some(u32::MAX), Some(100));
        let (page, total) = list_employees(&store, 100, offset).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 3);
    }
}
