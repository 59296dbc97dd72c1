use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::status::Outcome;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt object metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Aborts a handler. Each variant surfaces as one fixed [`Outcome`]; the
/// wrapped details are only ever logged.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or incorrect API key")]
    Unauthorized,
    #[error("object not found")]
    NotFound,
    #[error("method not allowed on upload route")]
    MethodNotAllowed,
    #[error("object already exists")]
    Conflict,
    #[error("failed to save file: {0}")]
    FailedFileSave(#[source] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn outcome(&self) -> Outcome {
        match self {
            ApiError::Unauthorized => Outcome::Unauthorized,
            ApiError::NotFound => Outcome::NotFound,
            ApiError::MethodNotAllowed => Outcome::MethodNotAllowed,
            ApiError::Conflict => Outcome::Conflict,
            ApiError::FailedFileSave(_) => Outcome::FailedFileSave,
            ApiError::Internal(_) => Outcome::InternalServerError,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Internal(format!("malformed multipart body: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::FailedFileSave(err) => tracing::error!(error = %err, "file save failed"),
            ApiError::Internal(detail) => tracing::error!(%detail, "unhandled failure"),
            other => tracing::debug!(error = %other, "request aborted"),
        }

        self.outcome().into_response()
    }
}
