use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::llm::LlmError;

/// Request-level error taxonomy. Every handler returns `Result<_, AppError>`
/// and the mapping to an HTTP status lives here alone.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("edit rejected: only the latest document version may be edited")]
    StaleDocumentVersion,
    #[error("model response failed validation after retries")]
    ModelResponseInvalid,
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] LlmError),
    #[error("store operation failed: {0}")]
    Store(#[from] rusqlite::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StaleDocumentVersion => StatusCode::CONFLICT,
            AppError::ModelResponseInvalid
            | AppError::ModelUnavailable(_)
            | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the client. Store and provider details
    /// stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Store(_) => "internal server error".to_string(),
            AppError::ModelUnavailable(_) => "generation service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
