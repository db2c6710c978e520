//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL and in-memory implementations
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Account registration and login with email + password
//! - Permanent sessions keyed by (account, device), one per device
//! - Short-lived access tokens and rotating refresh tokens
//! - Password change and account deletion
//!
//! ## Security Model
//! - Passwords and refresh tokens stored as salted, peppered Argon2id hashes
//! - Unknown email and wrong password are indistinguishable to the caller
//! - A refresh token works exactly once; rotation is a conditional write
//! - Access tokens are honored only while their session row exists

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use domain::{AccountDataPurge, NoAccountData, RequestContext};
pub use error::{AuthError, AuthResult};
pub use infra::memory::MemoryAuthRepository;
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::{auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::infra::postgres::PgAuthRepository as AuthStore;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}

#[cfg(test)]
mod tests;
