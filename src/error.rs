use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} is malformed: {reason}")]
    MalformedInput { field: &'static str, reason: String },

    #[error("location is {distance_m:.0} m from the office; allowed radius is {radius_m:.0} m")]
    OutsideGeofence { distance_m: f64, radius_m: f64 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("location policy is not configured")]
    NotConfigured,

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("failed to store evidence")]
    Evidence(#[source] std::io::Error),

    #[error("storage failure")]
    Storage(#[from] StoreError),

    #[error("credential processing failed")]
    Credential,

    #[error("failed to encode response")]
    Encoding(#[from] serde_json::Error),
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::MissingField(_) | AttendanceError::MalformedInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::OutsideGeofence { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::NotFound(_) | AttendanceError::NotConfigured => StatusCode::NOT_FOUND,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::Evidence(_)
            | AttendanceError::Storage(_)
            | AttendanceError::Credential
            | AttendanceError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            return HttpResponse::build(status).json(json!({
                "status": "error",
                "message": "Internal Server Error"
            }));
        }

        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        match self {
            AttendanceError::MissingField(field) | AttendanceError::MalformedInput { field, .. } => {
                body["field"] = json!(field);
            }
            AttendanceError::OutsideGeofence {
                distance_m,
                radius_m,
            } => {
                body["distance_m"] = json!(distance_m.round());
                body["radius_m"] = json!(radius_m);
            }
            _ => {}
        }
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            AttendanceError::MissingField("date").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::OutsideGeofence {
                distance_m: 222.0,
                radius_m: 100.0
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AttendanceError::NotConfigured.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = AttendanceError::Storage(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "storage failure");
    }
}
