use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        auth::bearer_token,
        jwt::{Subject, expires_at, generate_access_token, generate_refresh_token, issue_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AttendanceError,
    model::user::User,
    models::{ForgotPasswordReq, LoginReqDto, MessageResponse, ResetPasswordReq, TokenPair, TokenType},
    store::Store,
    utils::notifier::ResetNotifier,
};

fn token_failure(e: jsonwebtoken::errors::Error) -> AttendanceError {
    error!(error = %e, "Failed to sign token");
    AttendanceError::Credential
}

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}))
}

async fn subject_for(store: &dyn Store, user: &User) -> Result<Subject, AttendanceError> {
    let employee_id = store.find_employee_by_user(user.id).await?.map(|e| e.id);
    Ok(Subject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        employee_id,
    })
}

/// Issues a fresh access token and a persisted refresh token.
async fn issue_pair(
    store: &dyn Store,
    config: &Config,
    subject: &Subject,
    rotate_from: Option<&str>,
) -> Result<Option<TokenPair>, AttendanceError> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_failure)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_failure)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    let expires = expires_at(&refresh_claims);
    match rotate_from {
        Some(old_jti) => {
            let rotated = store
                .rotate_refresh_token(subject.user_id, old_jti, &refresh_claims.jti, expires)
                .await?;
            if !rotated {
                return Ok(None);
            }
        }
        None => {
            store
                .store_refresh_token(subject.user_id, &refresh_claims.jti, expires)
                .await?
        }
    }

    Ok(Some(TokenPair {
        access_token,
        refresh_token,
        role: subject.role,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access and refresh token", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[instrument(name = "auth_login", skip(store, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Ok(HttpResponse::BadRequest().json(json!({"error": "Email and password required"})));
    }

    let Some(db_user) = store.find_user_by_email(&email).await? else {
        info!("Invalid credentials: user not found");
        return Ok(invalid_credentials());
    };

    if !verify_password(&user.password, &db_user.password_hash) {
        info!("Invalid credentials: password mismatch");
        return Ok(invalid_credentials());
    }

    let subject = subject_for(store.get_ref(), &db_user).await?;
    let Some(pair) = issue_pair(store.get_ref(), &config, &subject, None).await? else {
        return Ok(invalid_credentials());
    };

    info!(user_id = db_user.id, role = %db_user.role, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid, revoked or expired refresh token"),
    )
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let Some(token) = bearer_token(&req) else {
        return Ok(HttpResponse::Unauthorized().json(json!({"error": "No token"})));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    // Role or profile may have changed since the token was issued.
    let Some(db_user) = store.find_user(claims.user_id).await? else {
        return Ok(HttpResponse::Unauthorized().finish());
    };
    let subject = subject_for(store.get_ref(), &db_user).await?;

    match issue_pair(store.get_ref(), &config, &subject, Some(&claims.jti)).await? {
        Some(pair) => {
            debug!(user_id = subject.user_id, "Refresh token rotated");
            Ok(HttpResponse::Ok().json(pair))
        }
        None => {
            info!(user_id = claims.user_id, "Refresh rejected: token revoked or unknown");
            Ok(HttpResponse::Unauthorized().finish())
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses((status = 204, description = "Refresh token revoked"))
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let claims = bearer_token(&req).and_then(|t| verify_token(t, &config.jwt_secret).ok());

    // Only refresh tokens can logout; anything else is a no-op.
    if let Some(claims) = claims.filter(|c| c.token_type == TokenType::Refresh) {
        store.revoke_refresh_token(&claims.jti).await?;
        info!(user_id = claims.user_id, "Logged out");
    }

    Ok(HttpResponse::NoContent().finish())
}

const RESET_REQUESTED: &str = "If the account exists, reset instructions have been sent";

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordReq,
    responses(
        (status = 200, description = "Same answer whether or not the account exists", body = MessageResponse),
        (status = 400, description = "Email missing"),
    )
)]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordReq>,
    store: web::Data<dyn Store>,
    notifier: web::Data<dyn ResetNotifier>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let email = body
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or(AttendanceError::MissingField("email"))?;

    let Some(user) = store.find_user_by_email(&email).await? else {
        info!("Password reset requested for unknown email");
        return Ok(HttpResponse::Ok().json(MessageResponse::success(RESET_REQUESTED)));
    };

    let subject = Subject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
        employee_id: None,
    };
    let (reset_token, claims) = issue_token(
        &subject,
        TokenType::Reset,
        &config.jwt_secret,
        config.reset_token_ttl,
    )
    .map_err(token_failure)?;

    store
        .store_reset_token(user.id, &claims.jti, expires_at(&claims))
        .await?;

    // Delivery failures stay out of the response so it cannot reveal the account.
    if let Err(e) = notifier
        .send_reset(&user.email, &reset_token, config.reset_token_ttl)
        .await
    {
        error!(user_id = user.id, error = %e, "Failed to deliver reset token");
    } else {
        info!(user_id = user.id, "Password reset token issued");
    }

    Ok(HttpResponse::Ok().json(MessageResponse::success(RESET_REQUESTED)))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordReq,
    responses(
        (status = 200, description = "Password updated, all sessions signed out", body = MessageResponse),
        (status = 400, description = "Token or new password missing"),
        (status = 401, description = "Invalid, expired or already used reset token"),
    )
)]
pub async fn reset_password(
    body: web::Json<ResetPasswordReq>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let token = body
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(AttendanceError::MissingField("token"))?;
    let new_password = body
        .new_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(AttendanceError::MissingField("new_password"))?;

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Reset => c,
        _ => return Ok(invalid_reset_token()),
    };

    let password_hash = hash_password(new_password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AttendanceError::Credential
    })?;

    if !store
        .reset_password(claims.user_id, &claims.jti, &password_hash)
        .await?
    {
        info!(user_id = claims.user_id, "Reset rejected: token used, superseded or unknown");
        return Ok(invalid_reset_token());
    }

    info!(user_id = claims.user_id, "Password reset");
    Ok(HttpResponse::Ok().json(MessageResponse::success("Password updated")))
}

fn invalid_reset_token() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({"error": "Invalid or expired reset token"}))
}
