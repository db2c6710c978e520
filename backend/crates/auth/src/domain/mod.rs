//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{account::Account, permanent_session::PermanentSession};
pub use repository::{AccountDataPurge, AccountRepository, NoAccountData, SessionRepository};
pub use value_object::{email::Email, request_context::RequestContext};
