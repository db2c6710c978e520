//! Session Manager
//!
//! Creates, validates, rotates and revokes permanent sessions.
//!
//! Session state is derived at read time:
//! absent → active → expired (row kept, fails validation) → absent.
//! Refresh tokens are stored only as salted, peppered hashes.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, DeviceId};
use platform::deadline::within;
use platform::password::CredentialStore;

use crate::application::config::AuthConfig;
use crate::domain::entity::permanent_session::PermanentSession;
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

/// Session lifecycle component
pub struct SessionManager<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
    credentials: CredentialStore,
}

impl<S> SessionManager<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        let credentials = config.credential_store()?;
        Ok(Self {
            session_repo,
            config,
            credentials,
        })
    }

    /// Store a new session for the device, replacing any earlier one
    pub async fn create(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        refresh_token: &str,
    ) -> AuthResult<PermanentSession> {
        let token_hash = self
            .credentials
            .hash(refresh_token.as_bytes(), self.config.pepper())?;

        let session = PermanentSession::new(
            *account_id,
            *device_id,
            token_hash,
            self.config.session_ttl()?,
            Utc::now(),
        );

        within(self.config.store_timeout, self.session_repo.upsert(&session)).await?;

        tracing::info!(
            account_id = %account_id,
            device_id = %device_id,
            expires_at = %session.expires_at,
            "Session created"
        );

        Ok(session)
    }

    /// `true` iff the session exists, is unexpired and `presented` matches
    pub async fn validate(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        presented: &str,
    ) -> AuthResult<bool> {
        Ok(self
            .load_valid(account_id, device_id, presented)
            .await?
            .is_some())
    }

    /// Presence check only; ignores expiry and token
    pub async fn exists(&self, account_id: &AccountId, device_id: &DeviceId) -> AuthResult<bool> {
        let session = within(
            self.config.store_timeout,
            self.session_repo.find(account_id, device_id),
        )
        .await?;
        Ok(session.is_some())
    }

    /// Replace `old` with `new` if `old` is the current valid refresh token
    ///
    /// The write is conditional on the hash read during validation, so of
    /// two concurrent rotations presenting the same token at most one wins.
    /// On failure nothing is written.
    pub async fn rotate(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        old: &str,
        new: &str,
    ) -> AuthResult<()> {
        let Some(current) = self.load_valid(account_id, device_id, old).await? else {
            tracing::warn!(
                account_id = %account_id,
                device_id = %device_id,
                "Refresh token rejected"
            );
            return Err(AuthError::SessionInvalid);
        };

        let new_hash = self
            .credentials
            .hash(new.as_bytes(), self.config.pepper())?;

        let swapped = within(
            self.config.store_timeout,
            self.session_repo.update_token_hash_and_last_used(
                account_id,
                device_id,
                &current.token_hash,
                &new_hash,
                Utc::now(),
            ),
        )
        .await?;

        if !swapped {
            tracing::warn!(
                account_id = %account_id,
                device_id = %device_id,
                "Session rotated or revoked concurrently"
            );
            return Err(AuthError::SessionInvalid);
        }

        tracing::info!(
            account_id = %account_id,
            device_id = %device_id,
            "Session rotated"
        );

        Ok(())
    }

    pub async fn delete(&self, account_id: &AccountId, device_id: &DeviceId) -> AuthResult<bool> {
        within(
            self.config.store_timeout,
            self.session_repo.delete(account_id, device_id),
        )
        .await
    }

    pub async fn delete_all(&self, account_id: &AccountId) -> AuthResult<u64> {
        within(
            self.config.store_timeout,
            self.session_repo.delete_all_for_account(account_id),
        )
        .await
    }

    async fn load_valid(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        presented: &str,
    ) -> AuthResult<Option<PermanentSession>> {
        let Some(session) = within(
            self.config.store_timeout,
            self.session_repo.find(account_id, device_id),
        )
        .await?
        else {
            return Ok(None);
        };

        if session.is_expired_at(Utc::now()) {
            return Ok(None);
        }

        let matches = self.credentials.verify(
            presented.as_bytes(),
            self.config.pepper(),
            session.token_hash.as_str(),
        );

        Ok(matches.then_some(session))
    }
}
