//! Application error type shared by services, repositories and handlers.
//!
//! Every variant carries a human readable `message` and structured `details`.
//! The HTTP mapping lives in the [`IntoResponse`] impl so services never deal
//! with status codes.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::infrastructure::cache::CacheError;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Error payload embedded in JSON error responses.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// The operation needs a durable (user) identity and the caller has none.
    #[error("{message}")]
    Unauthenticated { message: String, details: Value },

    /// Credentials were presented but rejected. Never says which check failed.
    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    /// A refresh credential did not match the stored state (mismatch or replay).
    #[error("{message}")]
    TokenNotValid { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    AliasExists { message: String, details: Value },

    /// Store or cache timeout/unavailability. Safe to retry once.
    #[error("{message}")]
    Transient { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn unauthenticated(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthenticated {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }
    pub fn token_not_valid(message: impl Into<String>, details: Value) -> Self {
        Self::TokenNotValid {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn alias_exists(message: impl Into<String>, details: Value) -> Self {
        Self::AliasExists {
            message: message.into(),
            details,
        }
    }
    pub fn transient(message: impl Into<String>, details: Value) -> Self {
        Self::Transient {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns `true` for errors a caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Unauthenticated { .. } => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Unauthorized { .. } | AppError::TokenNotValid { .. } => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::AliasExists { .. } => (StatusCode::CONFLICT, "alias_unavailable"),
            AppError::Transient { .. } => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            AppError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Converts the error into the JSON error payload.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code) = self.parts();
        let (message, details) = match self {
            AppError::Validation { message, details }
            | AppError::Unauthenticated { message, details }
            | AppError::Unauthorized { message, details }
            | AppError::TokenNotValid { message, details }
            | AppError::NotFound { message, details }
            | AppError::AliasExists { message, details }
            | AppError::Transient { message, details }
            | AppError::Internal { message, details } => (message.clone(), details.clone()),
        };

        // Refresh mismatches surface exactly like any other rejected credential.
        if matches!(self, AppError::TokenNotValid { .. }) {
            return ErrorInfo {
                code,
                message: "Unauthorized".to_string(),
                details: json!({}),
            };
        }

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.parts();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::alias_exists(
                "Alias is not available",
                json!({ "constraint": db.constraint() }),
            );
        }

        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::warn!(error = %e, "Database unavailable");
                AppError::transient("Database unavailable", json!({}))
            }
            other => {
                tracing::error!(error = %other, "Database error");
                AppError::internal("Database error", json!({}))
            }
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        tracing::warn!(error = %e, "Cache unavailable");
        AppError::transient("Cache unavailable", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::bad_request("Validation failed", json!({ "fields": e.to_string() }))
    }
}
