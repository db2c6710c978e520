//! Redeem Use Case
//!
//! Turns a scanned code into its action payload while enforcing the
//! code's expiry and usage limit.
//!
//! Counters only move by compare-and-set on the value just read. A lost
//! race re-reads the account's counter and re-evaluates the policy, so a
//! redemption that succeeds was allowed by the state it replaced.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, QrCodeId};
use platform::deadline::within;

use crate::application::config::RedemptionConfig;
use crate::domain::entities::{QrCode, UserQrScan};
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::{ActionPayload, CounterUpdate};
use crate::error::{RedemptionError, RedemptionResult};

/// Redeem use case
pub struct RedeemUseCase<Q, C, S>
where
    Q: QrActionRepository,
    C: QrCodeRepository,
    S: UserQrScanRepository,
{
    action_repo: Arc<Q>,
    code_repo: Arc<C>,
    scan_repo: Arc<S>,
    config: Arc<RedemptionConfig>,
}

impl<Q, C, S> RedeemUseCase<Q, C, S>
where
    Q: QrActionRepository,
    C: QrCodeRepository,
    S: UserQrScanRepository,
{
    pub fn new(
        action_repo: Arc<Q>,
        code_repo: Arc<C>,
        scan_repo: Arc<S>,
        config: Arc<RedemptionConfig>,
    ) -> Self {
        Self {
            action_repo,
            code_repo,
            scan_repo,
            config,
        }
    }

    pub async fn execute(
        &self,
        code_id: &QrCodeId,
        account_id: &AccountId,
    ) -> RedemptionResult<ActionPayload> {
        let timeout = self.config.store_timeout;

        let code = within(timeout, self.code_repo.find_by_id(code_id))
            .await?
            .ok_or(RedemptionError::CodeNotFound)?;

        if code.is_expired_at(Utc::now()) {
            self.discard_expired(&code).await;
            return Err(RedemptionError::CodeExpired);
        }

        let mut payload: Option<ActionPayload> = None;

        for _ in 0..self.config.max_commit_attempts {
            let scan = self.load_or_create_scan(account_id, code_id).await?;

            let global_count = if code.has_global_quota() {
                within(timeout, self.scan_repo.sum_counts_for_code(code_id)).await?
            } else {
                0
            };

            if !code.policy.check(code.max_usages, scan.count, global_count) {
                tracing::debug!(
                    qr_code_id = %code_id,
                    account_id = %account_id,
                    account_count = scan.count,
                    global_count,
                    "Redemption denied by usage policy"
                );
                return Err(RedemptionError::LimitExceeded);
            }

            if payload.is_none() {
                let action = within(timeout, self.action_repo.find_by_id(&code.action_id))
                    .await?
                    .ok_or(RedemptionError::ActionNotFound)?;
                payload = Some(action.payload);
            }

            let update = within(
                timeout,
                self.scan_repo
                    .atomic_increment(account_id, code_id, scan.count),
            )
            .await?;

            let CounterUpdate::Applied(new_count) = update else {
                continue;
            };

            if code.has_global_quota() {
                if let Err(e) = self.claim_global_slot(&code).await {
                    self.compensate(account_id, code_id, new_count).await;
                    return Err(e);
                }
            }

            tracing::info!(
                qr_code_id = %code_id,
                account_id = %account_id,
                count = new_count,
                "QR code redeemed"
            );

            return payload.ok_or_else(|| {
                RedemptionError::Internal("payload missing after commit".to_string())
            });
        }

        Err(RedemptionError::Contention(self.config.max_commit_attempts))
    }

    /// Read the account's counter, creating it at zero on first use
    async fn load_or_create_scan(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
    ) -> RedemptionResult<UserQrScan> {
        let timeout = self.config.store_timeout;

        if let Some(scan) = within(timeout, self.scan_repo.find(account_id, code_id)).await? {
            return Ok(scan);
        }

        let fresh = UserQrScan::first(*account_id, *code_id);
        if within(timeout, self.scan_repo.insert_if_absent(&fresh)).await? {
            return Ok(fresh);
        }

        // Lost the insert race; the winner's row is there now
        within(timeout, self.scan_repo.find(account_id, code_id))
            .await?
            .ok_or_else(|| RedemptionError::Internal("scan row vanished after insert".to_string()))
    }

    /// Advance the code's aggregate counter while it is below the limit
    async fn claim_global_slot(&self, code: &QrCode) -> RedemptionResult<()> {
        let timeout = self.config.store_timeout;

        for _ in 0..self.config.max_commit_attempts {
            let current = within(timeout, self.code_repo.find_by_id(&code.id))
                .await?
                .ok_or(RedemptionError::CodeNotFound)?;

            if current.redemptions >= current.max_usages {
                return Err(RedemptionError::LimitExceeded);
            }

            let update = within(
                timeout,
                self.code_repo
                    .atomic_increment_redemptions(&code.id, current.redemptions),
            )
            .await?;

            if let CounterUpdate::Applied(_) = update {
                return Ok(());
            }
        }

        Err(RedemptionError::Contention(self.config.max_commit_attempts))
    }

    /// Undo a scan increment whose global slot could not be claimed
    ///
    /// Failure only leaves the account's counter one too high.
    async fn compensate(&self, account_id: &AccountId, code_id: &QrCodeId, committed: i64) {
        let timeout = self.config.store_timeout;
        let mut expected = committed;

        for _ in 0..self.config.max_commit_attempts {
            match within(
                timeout,
                self.scan_repo.atomic_decrement(account_id, code_id, expected),
            )
            .await
            {
                Ok(CounterUpdate::Applied(_)) => return,
                Ok(CounterUpdate::Conflict) => {
                    match within(timeout, self.scan_repo.find(account_id, code_id)).await {
                        Ok(Some(scan)) if scan.count > 0 => expected = scan.count,
                        Ok(_) => return,
                        Err(e) => {
                            tracing::warn!(
                                qr_code_id = %code_id,
                                account_id = %account_id,
                                error = %e,
                                "Failed to re-read scan counter during compensation"
                            );
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        qr_code_id = %code_id,
                        account_id = %account_id,
                        error = %e,
                        "Failed to compensate scan counter"
                    );
                    return;
                }
            }
        }

        tracing::warn!(
            qr_code_id = %code_id,
            account_id = %account_id,
            "Gave up compensating scan counter"
        );
    }

    /// Best-effort removal of an expired code and its counters
    async fn discard_expired(&self, code: &QrCode) {
        let timeout = self.config.store_timeout;

        if let Err(e) = within(timeout, self.scan_repo.delete_all_for_code(&code.id)).await {
            tracing::warn!(
                qr_code_id = %code.id,
                error = %e,
                "Failed to delete scans of expired code"
            );
            return;
        }

        match within(timeout, self.code_repo.delete(&code.id)).await {
            Ok(_) => tracing::info!(qr_code_id = %code.id, "Expired QR code deleted"),
            Err(e) => {
                tracing::warn!(qr_code_id = %code.id, error = %e, "Failed to delete expired code")
            }
        }
    }
}
