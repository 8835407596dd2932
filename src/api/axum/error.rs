use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::AccessError;
use crate::api::ErrorResponse;

/// converts `AccessError` into appropriate HTTP responses
///
/// `Forbidden` and `NotFound` share status and body so a response never
/// reveals whether a guarded resource exists.
#[derive(Debug)]
pub struct AppError(pub AccessError);

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AccessError::Unauthenticated | AccessError::TokenInvalid | AccessError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AccessError::Forbidden | AccessError::NotFound => StatusCode::FORBIDDEN,
            AccessError::Validation(_) | AccessError::AlreadyInOrganization => StatusCode::BAD_REQUEST,
            AccessError::DatabaseError(_) | AccessError::ConfigurationError(_) | AccessError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "tenantry", "msg=\"request failed\", error=\"{}\"", self.0);
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denials_share_status() {
        assert_eq!(AppError(AccessError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError(AccessError::NotFound).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError(AccessError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError(AccessError::AlreadyInOrganization).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError(AccessError::DatabaseError("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
