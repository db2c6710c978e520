//! Redemption Error Types
//!
//! This module provides redemption-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::deadline::DeadlineExceeded;
use thiserror::Error;

/// Redemption-specific result type alias
pub type RedemptionResult<T> = Result<T, RedemptionError>;

/// Redemption-specific error variants
#[derive(Debug, Error)]
pub enum RedemptionError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("QR code not found")]
    CodeNotFound,

    #[error("QR action not found")]
    ActionNotFound,

    #[error("QR code expired")]
    CodeExpired,

    #[error("QR code usage limit reached")]
    LimitExceeded,

    /// Freshly generated id already present
    #[error("Identifier already in use")]
    DuplicateId,

    /// Compare-and-set kept losing to concurrent writers
    #[error("Too much contention on counter after {0} attempts")]
    Contention(u32),

    /// A cascading delete stopped after some steps had committed
    #[error("Partial failure: {0}")]
    PartialFailure(String),

    /// Admin check or other identity failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Store deadline exceeded
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DeadlineExceeded),

    /// Backend error, already classified by the kernel
    #[error("Store error: {0}")]
    Store(#[source] AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RedemptionError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedemptionError::InvalidPayload(_) | RedemptionError::InvalidInput(_) => {
                ErrorKind::Validation
            }
            RedemptionError::CodeNotFound | RedemptionError::ActionNotFound => ErrorKind::NotFound,
            RedemptionError::CodeExpired => ErrorKind::Expired,
            RedemptionError::LimitExceeded => ErrorKind::LimitExceeded,
            RedemptionError::DuplicateId => ErrorKind::Conflict,
            RedemptionError::Contention(_) | RedemptionError::StoreUnavailable(_) => {
                ErrorKind::Unavailable
            }
            RedemptionError::PartialFailure(_) => ErrorKind::PartialFailure,
            RedemptionError::Auth(e) => e.kind(),
            RedemptionError::Store(e) => e.kind(),
            RedemptionError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Convert to AppError
    ///
    /// Backend details stay in the logs; the response only carries the kind.
    pub fn to_app_error(&self) -> AppError {
        match self {
            RedemptionError::Auth(e) => e.to_app_error(),
            RedemptionError::StoreUnavailable(_) | RedemptionError::Contention(_) => {
                AppError::unavailable("Store temporarily unavailable")
            }
            RedemptionError::Store(e) if e.is_retryable() => {
                AppError::unavailable("Store temporarily unavailable")
            }
            RedemptionError::Store(e) => AppError::new(e.kind(), e.kind().as_str()),
            RedemptionError::Internal(_) => AppError::internal("Internal error"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            RedemptionError::Store(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Redemption store error");
            }
            RedemptionError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Redemption store timed out");
            }
            RedemptionError::Internal(msg) => {
                tracing::error!(message = %msg, "Redemption internal error");
            }
            RedemptionError::PartialFailure(msg) => {
                tracing::error!(message = %msg, "Redemption cascade stopped midway");
            }
            RedemptionError::Contention(attempts) => {
                tracing::warn!(attempts, "Redemption gave up on contended counter");
            }
            RedemptionError::Auth(AuthError::NotAdmin) => {
                tracing::warn!("Non-admin access to QR management");
            }
            _ => {
                tracing::debug!(error = %self, "Redemption error");
            }
        }
    }
}

impl IntoResponse for RedemptionError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<sqlx::Error> for RedemptionError {
    fn from(err: sqlx::Error) -> Self {
        RedemptionError::Store(AppError::from(err))
    }
}

impl From<RedemptionError> for AppError {
    fn from(err: RedemptionError) -> Self {
        err.to_app_error()
    }
}

/// Scan cleanup runs on behalf of account deletion in the auth context
impl From<RedemptionError> for AuthError {
    fn from(err: RedemptionError) -> Self {
        match err {
            RedemptionError::Auth(e) => e,
            RedemptionError::StoreUnavailable(e) => AuthError::StoreUnavailable(e),
            RedemptionError::Store(e) => AuthError::Store(e),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
