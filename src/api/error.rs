//! API error taxonomy and the uniform error envelope.
//!
//! Every error response has the shape
//! `{ "error": { "code": "...", "message": "..." } }` so clients can branch
//! on the machine code without parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::diagnosis::InvalidInput;
use crate::storage::StorageError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller error: wrong image count or malformed upload.
    #[error("{0}")]
    Validation(String),

    /// A required backing store is not available.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// Storing one view image failed; names the offending view.
    #[error("failed to store image for view {view}: {source}")]
    ViewUpload {
        view: usize,
        #[source]
        source: StorageError,
    },

    /// Preprocessing or model inference failed; names the offending view.
    #[error("failed to classify view {view}: {source}")]
    Classification {
        view: usize,
        #[source]
        source: ClassifierError,
    },

    /// Classifier output did not match the configured vocabularies.
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] InvalidInput),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ViewUpload { .. }
            | ApiError::Classification { .. }
            | ApiError::Aggregation(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "BAD_REQUEST",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::ViewUpload { .. } => "STORAGE_ERROR",
            ApiError::Classification { .. } => "CLASSIFICATION_ERROR",
            ApiError::Aggregation(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
        }
    }
}

/// Error detail inside the envelope.
#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Validation(format!("malformed multipart upload: {err}"))
    }
}
