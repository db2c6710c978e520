//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.
//!
//! Every write touches a single row, or all rows for one key prefix.
//! Counters only move through compare-and-set on an expected prior value.

use kernel::id::{AccountId, QrActionId, QrCodeId};

use crate::domain::entities::{QrAction, QrCode, UserQrScan};
use crate::domain::value_objects::CounterUpdate;
use crate::error::RedemptionResult;

/// QR action repository trait
#[trait_variant::make(QrActionRepository: Send)]
pub trait LocalQrActionRepository {
    /// Returns `false` if the id is taken
    async fn insert_if_absent(&self, action: &QrAction) -> RedemptionResult<bool>;

    async fn find_by_id(&self, action_id: &QrActionId) -> RedemptionResult<Option<QrAction>>;

    /// Returns `false` if the action did not exist
    async fn delete(&self, action_id: &QrActionId) -> RedemptionResult<bool>;

    /// Oldest first, at most `limit` rows
    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrAction>>;
}

/// QR code repository trait
#[trait_variant::make(QrCodeRepository: Send)]
pub trait LocalQrCodeRepository {
    /// Returns `false` if the id is taken
    async fn insert_if_absent(&self, code: &QrCode) -> RedemptionResult<bool>;

    async fn find_by_id(&self, code_id: &QrCodeId) -> RedemptionResult<Option<QrCode>>;

    /// Returns `false` if the code did not exist
    async fn delete(&self, code_id: &QrCodeId) -> RedemptionResult<bool>;

    /// Oldest first, at most `limit` rows
    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrCode>>;

    /// Add one to `redemptions` if it still equals `expected_prior`
    async fn atomic_increment_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate>;

    /// Take `amount` off `redemptions` if it still equals `expected_prior`
    ///
    /// Never takes the counter below zero.
    async fn atomic_release_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
        amount: i64,
    ) -> RedemptionResult<CounterUpdate>;
}

/// Per-account scan counter repository trait
#[trait_variant::make(UserQrScanRepository: Send)]
pub trait LocalUserQrScanRepository {
    /// Returns `false` if the (account, code) row already exists
    async fn insert_if_absent(&self, scan: &UserQrScan) -> RedemptionResult<bool>;

    async fn find(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
    ) -> RedemptionResult<Option<UserQrScan>>;

    /// Sum of all accounts' counts for the code
    async fn sum_counts_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<i64>;

    /// Add one to the count if it still equals `expected_prior`
    async fn atomic_increment(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate>;

    /// Subtract one from the count if it still equals `expected_prior`
    ///
    /// Never takes the count below zero.
    async fn atomic_decrement(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate>;

    /// Every counter the account holds, across all codes
    async fn list_for_account(&self, account_id: &AccountId) -> RedemptionResult<Vec<UserQrScan>>;

    async fn delete_all_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<u64>;

    async fn delete_all_for_account(&self, account_id: &AccountId) -> RedemptionResult<u64>;
}
