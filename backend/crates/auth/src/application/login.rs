//! Login Use Case
//!
//! Authenticates an account and opens a session for the calling device.

use std::sync::Arc;

use kernel::id::{AccountId, DeviceId};

use crate::application::account_directory::AccountDirectory;
use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::error::AuthResult;

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub device_id: DeviceId,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    pub account_id: AccountId,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Login use case
pub struct LoginUseCase<A, S>
where
    A: AccountRepository,
    S: SessionRepository,
{
    accounts: AccountDirectory<A>,
    sessions: SessionManager<S>,
    config: Arc<AuthConfig>,
}

impl<A, S> LoginUseCase<A, S>
where
    A: AccountRepository,
    S: SessionRepository,
{
    pub fn new(
        account_repo: Arc<A>,
        session_repo: Arc<S>,
        config: Arc<AuthConfig>,
    ) -> AuthResult<Self> {
        Ok(Self {
            accounts: AccountDirectory::new(account_repo, config.clone())?,
            sessions: SessionManager::new(session_repo, config.clone())?,
            config,
        })
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        let account = self
            .accounts
            .authenticate(&input.email, input.password)
            .await?;

        let tokens = self.config.token_issuer().issue_pair(
            &account.account_id.to_string(),
            self.config.access_ttl()?,
            self.config.session_ttl()?,
        )?;

        self.sessions
            .create(&account.account_id, &input.device_id, &tokens.refresh)
            .await?;

        tracing::info!(
            account_id = %account.account_id,
            device_id = %input.device_id,
            "Account signed in"
        );

        Ok(LoginOutput {
            account_id: account.account_id,
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            expires_in: tokens.expires_in,
        })
    }
}
