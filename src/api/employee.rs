use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    model::employee::Employee,
    service::employee::{self as service, CreateEmployee, UpdateEmployee},
    store::Store,
    utils::email_registry::EmailRegistry,
};

#[derive(Debug, Deserialize)]
pub struct EmployeeQuery {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Items per page, at most 100.
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: u64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing or malformed field", body = Object, example = json!({
            "status": "error",
            "message": "phone_number is required",
            "field": "phone_number"
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "status": "error",
            "message": "email already exists"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    body: web::Json<CreateEmployee>,
    store: web::Data<dyn Store>,
    registry: web::Data<EmailRegistry>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee = service::create_employee(store.get_ref(), &registry, &body).await?;

    Ok(HttpResponse::Created().json(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (page, per_page, offset) = service::page_window(query.page, query.per_page);
    let (data, total) = service::list_employees(store.get_ref(), per_page, offset).await?;
    debug!(total, page, per_page, offset, "Listing employees");

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee
#[utoipa::path(
    get,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee = service::get_employee(store.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Missing or malformed field"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "status": "error",
            "message": "employee not found"
        })),
        (status = 409, description = "Email already registered")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
    store: web::Data<dyn Store>,
    registry: web::Data<EmailRegistry>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee =
        service::update_employee(store.get_ref(), &registry, path.into_inner(), &body).await?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee, identity and attendance deleted", body = Object, example = json!({
            "status": "success",
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
    registry: web::Data<EmailRegistry>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    service::delete_employee(store.get_ref(), &registry, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Successfully deleted"
    })))
}

/// Own profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "The caller's employee profile", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn profile(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let employee = store
        .find_employee(employee_id)
        .await
        .map_err(AttendanceError::from)?
        .ok_or(AttendanceError::NotFound("employee"))?;

    Ok(HttpResponse::Ok().json(employee))
}
