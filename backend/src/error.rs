//! Error handling for the stock ledger server
//!
//! Provides consistent error responses in English and Persian

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::balance::BalanceOverflow;
use shared::MovementError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("External API disabled")]
    ExternalApiDisabled,

    // Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    // Reference errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger errors
    #[error("Insufficient stock: {available} available")]
    InsufficientStock { available: Decimal },

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TokenExpired | AppError::InvalidToken | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ExternalApiDisabled => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MovementError> for AppError {
    fn from(err: MovementError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}

/// Field named in a deserialization message.
///
/// Handles ``missing field `lotId` `` and the `quantity: invalid type ..` form,
/// after stripping the leading `Failed to deserialize ..: ` context.
fn rejected_field(message: &str) -> Option<String> {
    let detail = message.split_once(": ").map_or(message, |(_, rest)| rest);
    if let Some((_, rest)) = detail.split_once("missing field `") {
        return rest.split('`').next().map(str::to_string);
    }
    let (path, _) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then(|| path.to_string())
}

fn rejection(fallback: &str, message: String) -> AppError {
    let field = rejected_field(&message).unwrap_or_else(|| fallback.to_string());
    AppError::Validation { field, message }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        rejection("body", err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        rejection("query", err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        match err {
            PathRejection::FailedToDeserializePathParams(inner) => {
                rejection("path", inner.body_text())
            }
            other => AppError::Internal(other.body_text()),
        }
    }
}

impl From<BalanceOverflow> for AppError {
    fn from(err: BalanceOverflow) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_fa: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Quantity still available, on insufficient stock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_fa: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_fa: message_fa.into(),
            field: None,
            available: None,
        }
    }
}

impl AppError {
    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::TokenExpired => {
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired", "توکن منقضی شده است")
            }
            AppError::InvalidToken => {
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "توکن نامعتبر است")
            }
            AppError::Unauthorized(message) => {
                ErrorDetail::new("UNAUTHORIZED", message.clone(), "دسترسی غیرمجاز")
            }
            AppError::ExternalApiDisabled => ErrorDetail::new(
                "EXTERNAL_API_DISABLED",
                "The external API is disabled",
                "API خارجی غیرفعال است",
            ),
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone(), "داده‌های ورودی نامعتبر است")
            },
            AppError::NotFound(resource) => ErrorDetail::new(
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("{} یافت نشد", resource),
            ),
            AppError::InsufficientStock { available } => ErrorDetail {
                available: Some(*available),
                ..ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!("Insufficient stock, {} available", available),
                    "موجودی کافی نیست",
                )
            },
            AppError::Conflict { resource, message } => ErrorDetail {
                field: Some(resource.clone()),
                ..ErrorDetail::new("CONFLICT", message.clone(), "تداخل در ثبت، دوباره تلاش کنید")
            },
            AppError::Configuration(msg) => ErrorDetail::new(
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                "خطا در پیکربندی",
            ),
            AppError::DatabaseError(_) => ErrorDetail::new(
                "DATABASE_ERROR",
                "A database error occurred",
                "خطای پایگاه داده",
            ),
            AppError::Internal(msg) => {
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), "خطای داخلی سرور")
            }
            AppError::InternalError(_) => ErrorDetail::new(
                "INTERNAL_ERROR",
                "An internal server error occurred",
                "خطای داخلی سرور",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_detail = self.detail();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(code = %error_detail.code, "{}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
