//! Account Scan Purge
//!
//! Runs inside account deletion. Removes the account's scan counters and
//! hands its share of every Global quota back to the code, so the code's
//! aggregate counter keeps matching the sum of the remaining counters.
//!
//! Counters are deleted before quota is released. A failed release leaves
//! the code's counter too high, which can only refuse a redemption the
//! sum would have allowed, never admit one past the limit.

use std::sync::Arc;

use auth::{AccountDataPurge, AuthResult};
use kernel::id::AccountId;
use platform::deadline::within;

use crate::application::config::RedemptionConfig;
use crate::domain::entities::UserQrScan;
use crate::domain::repository::{QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::CounterUpdate;
use crate::error::{RedemptionError, RedemptionResult};

/// Purge of an account's redemption data, plugged into account deletion
pub struct AccountScanPurge<C, S>
where
    C: QrCodeRepository,
    S: UserQrScanRepository,
{
    code_repo: Arc<C>,
    scan_repo: Arc<S>,
    config: Arc<RedemptionConfig>,
}

impl<C, S> AccountScanPurge<C, S>
where
    C: QrCodeRepository,
    S: UserQrScanRepository,
{
    pub fn new(code_repo: Arc<C>, scan_repo: Arc<S>, config: Arc<RedemptionConfig>) -> Self {
        Self {
            code_repo,
            scan_repo,
            config,
        }
    }

    async fn purge(&self, account_id: &AccountId) -> RedemptionResult<u64> {
        let timeout = self.config.store_timeout;

        let scans = within(timeout, self.scan_repo.list_for_account(account_id)).await?;
        let deleted = within(timeout, self.scan_repo.delete_all_for_account(account_id)).await?;

        for scan in scans.iter().filter(|scan| scan.count > 0) {
            if let Err(e) = self.release(scan).await {
                tracing::warn!(
                    qr_code_id = %scan.code_id,
                    account_id = %account_id,
                    amount = scan.count,
                    error = %e,
                    "Failed to release global quota of deleted account"
                );
            }
        }

        Ok(deleted)
    }

    /// Take the scan's count off its code's aggregate counter
    async fn release(&self, scan: &UserQrScan) -> RedemptionResult<()> {
        let timeout = self.config.store_timeout;

        for _ in 0..self.config.max_commit_attempts {
            let Some(code) = within(timeout, self.code_repo.find_by_id(&scan.code_id)).await?
            else {
                return Ok(());
            };
            if !code.has_global_quota() {
                return Ok(());
            }

            let update = within(
                timeout,
                self.code_repo
                    .atomic_release_redemptions(&code.id, code.redemptions, scan.count),
            )
            .await?;

            if let CounterUpdate::Applied(remaining) = update {
                tracing::debug!(
                    qr_code_id = %code.id,
                    released = scan.count,
                    remaining,
                    "Global quota released"
                );
                return Ok(());
            }
        }

        Err(RedemptionError::Contention(self.config.max_commit_attempts))
    }
}

impl<C, S> AccountDataPurge for AccountScanPurge<C, S>
where
    C: QrCodeRepository + Send + Sync,
    S: UserQrScanRepository + Send + Sync,
{
    async fn purge_account_data(&self, account_id: &AccountId) -> AuthResult<u64> {
        Ok(self.purge(account_id).await?)
    }
}
