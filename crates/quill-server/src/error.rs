//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_ai::AiError;
use quill_core::{QuillError, StoreError};
use thiserror::Error;

/// Error returned by a handler, rendered as `{"error": message}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Quill(#[from] QuillError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists(_) | StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(e) => store_status(e),
            ApiError::Quill(e) => match e {
                QuillError::Store(e) => store_status(e),
                QuillError::Validation(_) => StatusCode::BAD_REQUEST,
                QuillError::ChapterNotFound(_) => StatusCode::NOT_FOUND,
                QuillError::InvalidOperation(_) => StatusCode::CONFLICT,
                QuillError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Ai(e) => match e {
                AiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                AiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
                AiError::UnknownAction(_) | AiError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message placed in the response body.
    pub fn message(&self) -> String {
        match self {
            ApiError::Ai(e) => e.user_message(),
            ApiError::Quill(QuillError::Validation(e)) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::ValidationError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::AlreadyExists("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(QuillError::from(ValidationError::required(
                "title",
                "Title is required"
            )))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AiError::from_status(429, "")).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_ai_message_is_user_facing() {
        let err = ApiError::from(AiError::Network("connection reset".into()));
        assert_eq!(err.message(), "AI operation failed");
    }
}
