//! QR Redemption Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Actions, codes, scan counters, usage policy, repository traits
//! - `application/` - Redemption and admin management use cases
//! - `infra/` - PostgreSQL and in-memory implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Consistency Model
//! - The store offers single-row conditional writes only
//! - Every counter moves by compare-and-set on the value last observed,
//!   retried a bounded number of times
//! - Global quotas are enforced on the code's aggregate counter, so no
//!   interleaving of concurrent redemptions can exceed them
//! - Cascading deletes run step by step and report partial failure
//! - Deleting an account hands its share of Global quotas back

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::RedemptionConfig;
pub use application::purge_account::AccountScanPurge;
pub use error::{RedemptionError, RedemptionResult};
pub use infra::memory::MemoryRedemptionRepository;
pub use infra::postgres::PgRedemptionRepository;
pub use presentation::router::{qr_router, qr_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entities::*;
    pub use crate::domain::value_objects::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::infra::postgres::PgRedemptionRepository as RedemptionStore;
}

#[cfg(test)]
mod tests;
