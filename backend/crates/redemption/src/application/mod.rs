//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.

pub mod config;
pub mod manage_actions;
pub mod manage_codes;
pub mod purge_account;
pub mod redeem;

// Re-exports
pub use config::RedemptionConfig;
pub use manage_actions::ManageActionsUseCase;
pub use manage_codes::{CreateCodeInput, ManageCodesUseCase};
pub use purge_account::AccountScanPurge;
pub use redeem::RedeemUseCase;
