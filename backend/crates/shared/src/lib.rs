//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of domain vocabulary:
//! - The service-wide error taxonomy ([`error::kind::ErrorKind`]) and
//!   [`error::app_error::AppError`]
//! - Typed identifiers for accounts, devices and QR entities
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
