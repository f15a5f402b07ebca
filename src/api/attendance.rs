use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    service::attendance::{
        CheckInSubmission, ClockOutSubmission, derive_status_for_day,
        employee_recap, format_for_display, record_clock_out, validate_check_in,
    },
    store::Store,
    utils::{
        clock::Clock,
        evidence::EvidenceStore,
        time_format::{format_date, parse_date},
    },
};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// `YYYY-MM-DD`; defaults to today.
    pub date: Option<String>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CheckInSubmission,
    responses(
        (status = 201, description = "Checked in", body = DisplayRow),
        (status = 400, description = "Missing or malformed field", body = Object, example = json!({
            "status": "error",
            "message": "date is malformed: expected YYYY-MM-DD, got \"2024-13-40\"",
            "field": "date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 422, description = "Outside the office geofence", body = Object, example = json!({
            "status": "error",
            "message": "location is 222 m from the office; allowed radius is 100 m",
            "distance_m": 222.0,
            "radius_m": 100.0
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    body: web::Json<CheckInSubmission>,
    store: web::Data<dyn Store>,
    evidence: web::Data<dyn EvidenceStore>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let record =
        validate_check_in(store.get_ref(), evidence.get_ref(), employee_id, &body).await?;

    Ok(HttpResponse::Created().json(format_for_display(&record, config.label_locale)))
}

/// Clock-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body = ClockOutSubmission,
    responses(
        (status = 200, description = "Clocked out", body = DisplayRow),
        (status = 400, description = "Missing or malformed field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "No check-in for the day", body = Object, example = json!({
            "status": "error",
            "message": "check-in for the day not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    body: web::Json<ClockOutSubmission>,
    store: web::Data<dyn Store>,
    clock: web::Data<dyn Clock>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let record = record_clock_out(store.get_ref(), clock.get_ref(), employee_id, &body).await?;

    Ok(HttpResponse::Ok().json(format_for_display(&record, config.label_locale)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(
        ("date" = Option<String>, Query, description = "Day as YYYY-MM-DD; defaults to today")
    ),
    responses(
        (status = 200, description = "Derived status for the day", body = Object, example = json!({
            "date": "2024-06-01",
            "status": "ABSENT_UNEXCUSED",
            "label": "Unexcused"
        })),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_status(
    auth: AuthUser,
    query: web::Query<StatusQuery>,
    store: web::Data<dyn Store>,
    clock: web::Data<dyn Clock>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let date = match query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(d) => parse_date("date", Some(d))?,
        None => clock.today(),
    };
    let status = derive_status_for_day(store.get_ref(), employee_id, date).await?;

    Ok(HttpResponse::Ok().json(json!({
        "date": format_date(date),
        "status": status.code(),
        "label": status.label(config.label_locale),
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/recap",
    responses(
        (status = 200, description = "Own attendance records", body = [DisplayRow]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn recap(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let rows = employee_recap(store.get_ref(), employee_id, config.label_locale).await?;

    Ok(HttpResponse::Ok().json(rows))
}
