//! Manage Actions Use Case
//!
//! Admin-only creation, lookup, listing and deletion of QR actions.
//! Deleting an action leaves codes that point at it in place; redeeming
//! such a code fails with `ActionNotFound`.

use std::sync::Arc;

use auth::application::AccountDirectory;
use auth::config::AuthConfig;
use auth::domain::AccountRepository;
use auth::RequestContext;
use kernel::id::QrActionId;
use platform::deadline::within;

use crate::application::config::RedemptionConfig;
use crate::domain::entities::QrAction;
use crate::domain::repository::QrActionRepository;
use crate::domain::value_objects::ActionPayload;
use crate::error::{RedemptionError, RedemptionResult};

/// Manage actions use case
pub struct ManageActionsUseCase<Q, A>
where
    Q: QrActionRepository,
    A: AccountRepository,
{
    action_repo: Arc<Q>,
    accounts: AccountDirectory<A>,
    config: Arc<RedemptionConfig>,
}

impl<Q, A> ManageActionsUseCase<Q, A>
where
    Q: QrActionRepository,
    A: AccountRepository,
{
    pub fn new(
        action_repo: Arc<Q>,
        account_repo: Arc<A>,
        auth_config: Arc<AuthConfig>,
        config: Arc<RedemptionConfig>,
    ) -> RedemptionResult<Self> {
        Ok(Self {
            action_repo,
            accounts: AccountDirectory::new(account_repo, auth_config)?,
            config,
        })
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        payload: String,
    ) -> RedemptionResult<QrAction> {
        self.accounts.require_admin(&ctx.account_id).await?;

        let action = QrAction::new(ActionPayload::new(payload)?);

        let inserted = within(
            self.config.store_timeout,
            self.action_repo.insert_if_absent(&action),
        )
        .await?;
        if !inserted {
            return Err(RedemptionError::DuplicateId);
        }

        tracing::info!(
            qr_action_id = %action.id,
            admin_id = %ctx.account_id,
            "QR action created"
        );

        Ok(action)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        action_id: &QrActionId,
    ) -> RedemptionResult<QrAction> {
        self.accounts.require_admin(&ctx.account_id).await?;

        within(
            self.config.store_timeout,
            self.action_repo.find_by_id(action_id),
        )
        .await?
        .ok_or(RedemptionError::ActionNotFound)
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        count: usize,
    ) -> RedemptionResult<Vec<QrAction>> {
        self.accounts.require_admin(&ctx.account_id).await?;
        let count = self.config.check_list_count(count)?;

        within(self.config.store_timeout, self.action_repo.list_up_to(count)).await
    }

    /// Remove the action; codes referencing it are left alone
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        action_id: &QrActionId,
    ) -> RedemptionResult<()> {
        self.accounts.require_admin(&ctx.account_id).await?;

        let deleted = within(
            self.config.store_timeout,
            self.action_repo.delete(action_id),
        )
        .await?;
        if !deleted {
            return Err(RedemptionError::ActionNotFound);
        }

        tracing::info!(
            qr_action_id = %action_id,
            admin_id = %ctx.account_id,
            "QR action deleted"
        );

        Ok(())
    }
}
