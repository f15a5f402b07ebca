use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::{
    api::employee::EmployeeListResponse,
    model::{employee::Employee, role::Role},
    models::{ForgotPasswordReq, LoginReqDto, MessageResponse, ResetPasswordReq, TokenPair},
    service::{
        attendance::{CheckInSubmission, ClockOutSubmission, DisplayRow, LeaveSubmission},
        employee::{CreateEmployee, UpdateEmployee},
        policy::{PolicyInput, PolicyView},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Employee Attendance

Employees check in with their location and optional photo evidence, request
leave and clock out. Administrators manage employees, set the office
geofence and read the attendance report.

### Attendance status
A day with no record counts as an **unexcused absence**. Check-ins outside
the configured office radius are rejected.

### Security
All endpoints except login and password recovery require a
**JWT Bearer** access token. Admin endpoints live under `/api/admin`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::forgot_password,
        crate::auth::handlers::reset_password,

        crate::api::attendance::check_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::day_status,
        crate::api::attendance::recap,

        crate::api::leave::request_leave,

        crate::api::employee::profile,
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::location::get_location,
        crate::api::location::put_location,

        crate::api::report::attendance_report
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Role,
            ForgotPasswordReq,
            ResetPasswordReq,
            MessageResponse,
            CheckInSubmission,
            LeaveSubmission,
            ClockOutSubmission,
            DisplayRow,
            PolicyInput,
            PolicyView,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and password recovery"),
        (name = "Attendance", description = "Check-in, clock-out and own attendance"),
        (name = "Leave", description = "Leave requests"),
        (name = "Employee", description = "Employee management and profile"),
        (name = "Admin", description = "Location policy and attendance report"),
    )
)]
pub struct ApiDoc;
