//! Manage Codes Use Case
//!
//! Admin-only creation, listing and deletion of QR codes.

use std::sync::Arc;

use auth::application::AccountDirectory;
use auth::config::AuthConfig;
use auth::domain::AccountRepository;
use auth::RequestContext;
use chrono::{DateTime, Utc};
use kernel::id::{QrActionId, QrCodeId};
use platform::deadline::within;

use crate::application::config::RedemptionConfig;
use crate::domain::entities::QrCode;
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::UsagePolicy;
use crate::error::{RedemptionError, RedemptionResult};

/// Code creation input
#[derive(Debug, Clone)]
pub struct CreateCodeInput {
    pub action_id: QrActionId,
    pub policy: UsagePolicy,
    /// 0 means unlimited
    pub max_usages: i64,
    pub expires_at: DateTime<Utc>,
}

/// Manage codes use case
pub struct ManageCodesUseCase<Q, C, S, A>
where
    Q: QrActionRepository,
    C: QrCodeRepository,
    S: UserQrScanRepository,
    A: AccountRepository,
{
    action_repo: Arc<Q>,
    code_repo: Arc<C>,
    scan_repo: Arc<S>,
    accounts: AccountDirectory<A>,
    config: Arc<RedemptionConfig>,
}

impl<Q, C, S, A> ManageCodesUseCase<Q, C, S, A>
where
    Q: QrActionRepository,
    C: QrCodeRepository,
    S: UserQrScanRepository,
    A: AccountRepository,
{
    pub fn new(
        action_repo: Arc<Q>,
        code_repo: Arc<C>,
        scan_repo: Arc<S>,
        account_repo: Arc<A>,
        auth_config: Arc<AuthConfig>,
        config: Arc<RedemptionConfig>,
    ) -> RedemptionResult<Self> {
        Ok(Self {
            action_repo,
            code_repo,
            scan_repo,
            accounts: AccountDirectory::new(account_repo, auth_config)?,
            config,
        })
    }

    /// Create a code for an existing action, expiring in the future
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateCodeInput,
    ) -> RedemptionResult<QrCode> {
        self.accounts.require_admin(&ctx.account_id).await?;

        if input.max_usages < 0 {
            return Err(RedemptionError::InvalidInput(
                "maxUsages cannot be negative".to_string(),
            ));
        }
        if input.expires_at <= Utc::now() {
            return Err(RedemptionError::InvalidInput(
                "expiry must be in the future".to_string(),
            ));
        }

        let timeout = self.config.store_timeout;

        within(timeout, self.action_repo.find_by_id(&input.action_id))
            .await?
            .ok_or(RedemptionError::ActionNotFound)?;

        let code = QrCode::new(input.action_id, input.policy, input.max_usages, input.expires_at);

        if !within(timeout, self.code_repo.insert_if_absent(&code)).await? {
            return Err(RedemptionError::DuplicateId);
        }

        tracing::info!(
            qr_code_id = %code.id,
            qr_action_id = %code.action_id,
            policy = %code.policy,
            max_usages = code.max_usages,
            expires_at = %code.expires_at,
            admin_id = %ctx.account_id,
            "QR code created"
        );

        Ok(code)
    }

    pub async fn list(&self, ctx: &RequestContext, count: usize) -> RedemptionResult<Vec<QrCode>> {
        self.accounts.require_admin(&ctx.account_id).await?;
        let count = self.config.check_list_count(count)?;

        within(self.config.store_timeout, self.code_repo.list_up_to(count)).await
    }

    /// Delete the scan counters, then the code
    ///
    /// If the counters are gone but the code row survives, the result is
    /// `PartialFailure`; repeating the call completes the deletion.
    pub async fn delete(&self, ctx: &RequestContext, code_id: &QrCodeId) -> RedemptionResult<()> {
        self.accounts.require_admin(&ctx.account_id).await?;

        let timeout = self.config.store_timeout;

        within(timeout, self.code_repo.find_by_id(code_id))
            .await?
            .ok_or(RedemptionError::CodeNotFound)?;

        let scans = within(timeout, self.scan_repo.delete_all_for_code(code_id)).await?;

        within(timeout, self.code_repo.delete(code_id))
            .await
            .map_err(|e| {
                tracing::error!(
                    qr_code_id = %code_id,
                    scans_deleted = scans,
                    error = %e,
                    "QR code deletion stopped after scans were removed"
                );
                RedemptionError::PartialFailure(format!("Deleting code row failed: {e}"))
            })?;

        tracing::info!(
            qr_code_id = %code_id,
            scans_deleted = scans,
            admin_id = %ctx.account_id,
            "QR code deleted"
        );

        Ok(())
    }
}
