//! API Error Types
//!
//! Every failure a handler can return, and its mapping to an HTTP status
//! and a JSON body of the form `{error, code, request_id}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::fx::FxError;
use crate::jobs::JobError;
use crate::payments::PaymentError;
use crate::storage::StorageError;
use crate::trades::csv_import::CsvImportError;
use crate::trades::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Out of upload credits
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// Plan does not include the feature
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream provider failed
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Service unavailable (dependency down or not configured)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub request_id: String,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::PaymentRequired(_) => (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_CREDITS"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "UPGRADE_REQUIRED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::NotFound(what),
            StorageError::InvalidInput(msg) => ApiError::Validation(msg),
            StorageError::Conflict(msg) => ApiError::Conflict(msg),
            StorageError::InsufficientCredits => {
                ApiError::PaymentRequired("no upload credits left".to_string())
            }
            other => ApiError::Storage(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CsvImportError> for ApiError {
    fn from(err: CsvImportError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<FxError> for ApiError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::InvalidCurrency(_) => ApiError::Validation(err.to_string()),
            FxError::Unavailable => ApiError::ServiceUnavailable(err.to_string()),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => ApiError::ServiceUnavailable(err.to_string()),
            PaymentError::InvalidSessionId(_) => ApiError::Validation(err.to_string()),
            PaymentError::NotFound(id) => ApiError::NotFound(format!("checkout session {}", id)),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKey => ApiError::ServiceUnavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(name) => ApiError::NotFound(format!("job {}", name)),
            JobError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            JobError::Storage(e) => e.into(),
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mapping() {
        let cases = [
            (StorageError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (StorageError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (StorageError::InsufficientCredits, StatusCode::PAYMENT_REQUIRED),
            (StorageError::Lock("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn test_upstream_mapping() {
        assert_eq!(
            ApiError::from(FxError::Timeout).status_and_code().0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(PaymentError::NotConfigured).status_and_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PaymentError::InvalidSessionId("x".into())).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::Forbidden("csv import requires Pro".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "UPGRADE_REQUIRED");
        assert!(body["error"].as_str().unwrap().contains("requires Pro"));
        assert!(body["request_id"].is_string());
    }
}
