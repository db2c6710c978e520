//! Delete Account Use Case
//!
//! Removes an account and everything it owns, in this order:
//! 1. all sessions (access stops immediately)
//! 2. data held by other contexts (QR scan counters)
//! 3. the account row
//!
//! A failure in step 1 leaves the account usable and is returned as is.
//! A failure in step 2 or 3 leaves the account without sessions and is
//! reported as a partial failure; repeating the request finishes the job.

use std::sync::Arc;

use platform::deadline::within;

use crate::application::account_directory::AccountDirectory;
use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::{AccountDataPurge, AccountRepository, SessionRepository};
use crate::domain::value_object::request_context::RequestContext;
use crate::error::{AuthError, AuthResult};

/// Delete account use case
pub struct DeleteAccountUseCase<A, S, P>
where
    A: AccountRepository,
    S: SessionRepository,
    P: AccountDataPurge,
{
    accounts: AccountDirectory<A>,
    sessions: SessionManager<S>,
    purge: Arc<P>,
    config: Arc<AuthConfig>,
}

impl<A, S, P> DeleteAccountUseCase<A, S, P>
where
    A: AccountRepository,
    S: SessionRepository,
    P: AccountDataPurge,
{
    pub fn new(
        account_repo: Arc<A>,
        session_repo: Arc<S>,
        purge: Arc<P>,
        config: Arc<AuthConfig>,
    ) -> AuthResult<Self> {
        Ok(Self {
            accounts: AccountDirectory::new(account_repo, config.clone())?,
            sessions: SessionManager::new(session_repo, config.clone())?,
            purge,
            config,
        })
    }

    pub async fn execute(&self, ctx: &RequestContext) -> AuthResult<()> {
        let account_id = ctx.account_id;

        let sessions = self.sessions.delete_all(&account_id).await?;

        let purged = within(
            self.config.store_timeout,
            self.purge.purge_account_data(&account_id),
        )
        .await
        .map_err(|e| partial(&account_id, "owned data", e))?;

        let deleted = self
            .accounts
            .delete(&account_id)
            .await
            .map_err(|e| partial(&account_id, "account row", e))?;

        tracing::info!(
            account_id = %account_id,
            sessions_deleted = sessions,
            rows_purged = purged,
            account_deleted = deleted,
            "Account deleted"
        );

        Ok(())
    }
}

fn partial(account_id: &kernel::id::AccountId, step: &str, cause: AuthError) -> AuthError {
    tracing::error!(
        account_id = %account_id,
        step,
        error = %cause,
        "Account deletion stopped after sessions were revoked"
    );
    AuthError::PartialFailure(format!("Deleting {step} failed: {cause}"))
}
