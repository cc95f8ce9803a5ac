//! HTTP-facing error type for share handlers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Per-request failures. None of these end the session.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Read access forbidden")]
    Forbidden,
    #[error("File not found")]
    NotFound,
    #[error("Download limit reached")]
    Gone,
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Gone => StatusCode::GONE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
