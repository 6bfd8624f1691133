use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Mapping provider error: {0}")]
    MappingProvider(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(err: validator::ValidationErrors) -> Self {
        DispatchError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl From<ride_core::Error> for DispatchError {
    fn from(err: ride_core::Error) -> Self {
        match err {
            ride_core::Error::InvalidTransition { .. } => DispatchError::Conflict(err.to_string()),
            ride_core::Error::InvalidCoordinate(_) | ride_core::Error::InvalidDistance(_) => {
                DispatchError::Validation(err.to_string())
            }
            ride_core::Error::UnknownStatus(_) => DispatchError::Internal(err.to_string()),
        }
    }
}

impl From<realtime_hub::Error> for DispatchError {
    fn from(err: realtime_hub::Error) -> Self {
        DispatchError::Internal(format!("Broadcast error: {}", err))
    }
}

impl ResponseError for DispatchError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            DispatchError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DispatchError::SignatureVerification(_) => StatusCode::UNAUTHORIZED,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Conflict(_) => StatusCode::CONFLICT,
            // Downstream failures are opaque server errors to callers
            DispatchError::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::PaymentProvider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::MappingProvider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl DispatchError {
    fn error_type(&self) -> &str {
        match self {
            DispatchError::Database(sqlx::Error::RowNotFound) => "not_found",
            DispatchError::Database(_) => "database_error",
            DispatchError::Validation(_) => "validation_error",
            DispatchError::Unauthorized(_) => "unauthorized",
            DispatchError::SignatureVerification(_) => "signature_verification_failed",
            DispatchError::NotFound(_) => "not_found",
            DispatchError::Conflict(_) => "conflict",
            DispatchError::HttpClient(_) => "upstream_http_error",
            DispatchError::PaymentProvider(_) => "payment_provider_error",
            DispatchError::MappingProvider(_) => "mapping_provider_error",
            DispatchError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DispatchError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::SignatureVerification("bad mac".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::NotFound("ride").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DispatchError::Conflict("ride already accepted".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DispatchError::PaymentProvider("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_machine_stable_reason() {
        let err = DispatchError::Conflict("ride already accepted".into());
        assert_eq!(err.error_type(), "conflict");
        let err = DispatchError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.error_type(), "not_found");
    }
}
