use actix_web::{HttpResponse, Responder, web};

use crate::{
    auth::auth::AuthUser,
    service::policy::{PolicyInput, PolicyView, get_active_policy, set_policy},
    store::Store,
};

#[utoipa::path(
    get,
    path = "/api/admin/location",
    responses(
        (status = 200, description = "Active location policy", body = PolicyView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No policy configured", body = Object, example = json!({
            "status": "error",
            "message": "location policy is not configured"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn get_location(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let policy = get_active_policy(store.get_ref()).await?;

    Ok(HttpResponse::Ok().json(PolicyView::from(policy)))
}

#[utoipa::path(
    put,
    path = "/api/admin/location",
    request_body = PolicyInput,
    responses(
        (status = 200, description = "Policy replaced", body = PolicyView),
        (status = 400, description = "Missing or malformed field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn put_location(
    auth: AuthUser,
    body: web::Json<PolicyInput>,
    store: web::Data<dyn Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let policy = set_policy(store.get_ref(), &body).await?;

    Ok(HttpResponse::Ok().json(PolicyView::from(policy)))
}
