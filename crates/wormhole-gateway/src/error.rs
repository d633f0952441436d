use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;
use wormhole_core::{ShortenerError, StorageError};
use wormhole_redirector::RedirectorError;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    Redirect(RedirectorError),
    Storage(StorageError),
    /// The request itself is malformed, e.g. an unparsable body field.
    BadRequest(String),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Shortener(value)
    }
}

impl From<RedirectorError> for AppError {
    fn from(value: RedirectorError) -> Self {
        Self::Redirect(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

fn storage_status(err: &StorageError) -> (StatusCode, &'static str) {
    match err {
        StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        StorageError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Shortener(err) => match err {
                ShortenerError::AliasInvalid(_) => (StatusCode::BAD_REQUEST, "alias_invalid"),
                ShortenerError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                ShortenerError::InvalidExpiration(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_request")
                }
                ShortenerError::AliasTaken(_) => (StatusCode::CONFLICT, "alias_taken"),
                ShortenerError::DuplicateCode(_) => (StatusCode::CONFLICT, "duplicate_code"),
                ShortenerError::GenerationExhausted { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "generation_exhausted")
                }
                ShortenerError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
                }
                ShortenerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ShortenerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            AppError::Redirect(RedirectorError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Redirect(RedirectorError::Storage(err)) | AppError::Storage(err) => {
                storage_status(err)
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Shortener(err) => err.to_string(),
            AppError::Redirect(err) => err.to_string(),
            AppError::Storage(err) => err.to_string(),
            AppError::BadRequest(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.message(), "request failed");
            "internal server error".to_string()
        } else {
            self.message()
        };

        let body = ErrorResponse {
            success: false,
            error: code,
            message,
        };
        (status, Json(body)).into_response()
    }
}
