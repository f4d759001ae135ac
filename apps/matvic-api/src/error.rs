//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{code, message}` with a status
//! derived from the typed error below it. Storage details are logged and
//! replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use matvic_core::{CoreError, ValidationError};
use matvic_db::DbError;
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Cannot commit a sale with an empty cart")]
    EmptyCart,

    #[error("{0}")]
    InvalidPaymentMethod(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ProductNotFound(String),

    #[error("{0}")]
    InsufficientStock(String),

    /// The message is for the log only.
    #[error("{message}")]
    Storage { message: String, retryable: bool },
}

/// Response body for every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::EmptyCart => "EMPTY_CART",
            ApiError::InvalidPaymentMethod(_) => "INVALID_PAYMENT_METHOD",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::Storage { .. } => "STORAGE_FAILURE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::EmptyCart | ApiError::InvalidPaymentMethod(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) | ApiError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock(_) => StatusCode::CONFLICT,
            ApiError::Storage { retryable: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Storage { retryable: true, .. } => {
                "The database is busy, please retry".to_string()
            }
            ApiError::Storage { .. } => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Storage { message, .. } = &self {
            error!(status = status.as_u16(), error = %message, "Storage failure");
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        ApiError::Validation(error.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::EmptyCart => ApiError::EmptyCart,
            CoreError::InvalidPaymentMethod(_) => ApiError::InvalidPaymentMethod(error.to_string()),
            CoreError::ProductNotFound(_) => ApiError::ProductNotFound(error.to_string()),
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(error.to_string()),
            CoreError::Validation(e) => e.into(),
            CoreError::AmountOverflow => ApiError::Validation(error.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::Domain(e) => e.into(),
            DbError::NotFound { .. } => ApiError::NotFound(error.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Validation(error.to_string()),
            DbError::Busy(_) | DbError::PoolExhausted => ApiError::Storage {
                message: error.to_string(),
                retryable: true,
            },
            other => ApiError::Storage {
                message: other.to_string(),
                retryable: false,
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Signing(_) => ApiError::Storage {
                message: error.to_string(),
                retryable: false,
            },
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
