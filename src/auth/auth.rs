use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};
use serde_json::json;
use tracing::debug;

use crate::{
    auth::jwt::verify_token,
    config::Config,
    model::role::Role,
    models::{Claims, TokenType},
};

/// Identity of the caller, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Rejects anything but a valid access token.
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        Ok(Self {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            debug!(user_id = self.user_id, email = %self.email, "Admin access denied");
            Err(ErrorForbidden(json!({"error": "Admin only"})))
        }
    }

    /// The caller's employee id; identities without a profile are refused.
    pub fn require_employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden(json!({"error": "No employee profile for this account"})))
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(token) = bearer_token(req) else {
            return ready(Err(ErrorUnauthorized(json!({"error": "Missing token"}))));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ErrorInternalServerError("Config missing")));
        };

        let user = verify_token(token, &config.jwt_secret)
            .map_err(|_| "Invalid token")
            .and_then(AuthUser::from_claims)
            .map_err(|e| ErrorUnauthorized(json!({"error": e})));

        ready(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn regular() -> AuthUser {
        AuthUser {
            user_id: 7,
            email: "siti@company.com".into(),
            role: Role::Regular,
            employee_id: Some(3),
        }
    }

    #[actix_web::test]
    async fn extractor_prefers_user_set_by_middleware() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(regular());

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.require_employee().unwrap(), 3);
        assert!(user.require_admin().is_err());
    }

    #[actix_web::test]
    async fn extractor_without_token_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = AuthUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );
    }
}
