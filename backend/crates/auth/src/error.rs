//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::client::HeaderError;
use platform::deadline::DeadlineExceeded;
use platform::password::{PasswordHashError, PasswordPolicyError};
use platform::token::TokenError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password validation failed: {0}")]
    PasswordValidation(#[from] PasswordPolicyError),

    /// Bearer token or device id header missing or unreadable
    #[error("Invalid header: {0}")]
    InvalidHeader(#[from] HeaderError),

    /// Wrong email or password; never says which
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bad signature, malformed, expired or wrongly typed token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Session absent, expired or refresh token mismatch
    #[error("Session not found or expired")]
    SessionInvalid,

    #[error("Administrator privileges required")]
    NotAdmin,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Email already registered")]
    EmailTaken,

    /// A cascading delete stopped after some steps had committed
    #[error("Partial failure: {0}")]
    PartialFailure(String),

    /// Store deadline exceeded
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DeadlineExceeded),

    /// Backend error, already classified by the kernel
    #[error("Store error: {0}")]
    Store(#[source] AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidEmail(_)
            | AuthError::InvalidInput(_)
            | AuthError::PasswordValidation(_) => ErrorKind::Validation,
            AuthError::InvalidHeader(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::SessionInvalid => ErrorKind::Authentication,
            AuthError::NotAdmin => ErrorKind::Authorization,
            AuthError::AccountNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::PartialFailure(_) => ErrorKind::PartialFailure,
            AuthError::StoreUnavailable(_) => ErrorKind::Unavailable,
            AuthError::Store(e) => e.kind(),
            AuthError::Internal(_) => ErrorKind::Internal,
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
            AuthError::StoreUnavailable(_) => {
                AppError::unavailable("Store temporarily unavailable")
            }
            AuthError::Store(e) if e.is_retryable() => {
                AppError::unavailable("Store temporarily unavailable")
            }
            AuthError::Store(e) => AppError::new(e.kind(), e.kind().as_str()),
            AuthError::Internal(_) => AppError::internal("Internal error"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Store(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Auth store error");
            }
            AuthError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Auth store timed out");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::PartialFailure(msg) => {
                tracing::error!(message = %msg, "Auth cascade stopped midway");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::NotAdmin => {
                tracing::warn!("Non-admin access to privileged operation");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Store(AppError::from(err))
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AuthError::InvalidToken,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.to_app_error()
    }
}
