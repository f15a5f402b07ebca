use actix_web::{HttpResponse, Responder, web};

use crate::{
    auth::auth::AuthUser,
    config::Config,
    service::attendance::{LeaveSubmission, format_for_display, validate_leave_request},
    store::Store,
    utils::evidence::EvidenceStore,
};

/// Leave request endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = LeaveSubmission,
    responses(
        (status = 201, description = "Leave recorded", body = DisplayRow),
        (status = 400, description = "Missing reason or malformed date/time", body = Object, example = json!({
            "status": "error",
            "message": "reason is required",
            "field": "reason"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn request_leave(
    auth: AuthUser,
    body: web::Json<LeaveSubmission>,
    store: web::Data<dyn Store>,
    evidence: web::Data<dyn EvidenceStore>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let record =
        validate_leave_request(store.get_ref(), evidence.get_ref(), employee_id, &body).await?;

    Ok(HttpResponse::Created().json(format_for_display(&record, config.label_locale)))
}
