//! Refresh Use Case
//!
//! Exchanges a refresh token for a new token pair and rotates the
//! session so the presented refresh token stops working.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, DeviceId};
use platform::token::TokenType;

use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

/// Refresh output
#[derive(Debug)]
pub struct RefreshOutput {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Refresh use case
pub struct RefreshUseCase<S>
where
    S: SessionRepository,
{
    sessions: SessionManager<S>,
    config: Arc<AuthConfig>,
}

impl<S> RefreshUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        Ok(Self {
            sessions: SessionManager::new(session_repo, config.clone())?,
            config,
        })
    }

    pub async fn execute(
        &self,
        refresh_token: &str,
        device_id: DeviceId,
    ) -> AuthResult<RefreshOutput> {
        let issuer = self.config.token_issuer();
        let claims = issuer.parse(refresh_token)?;

        if claims.token_type() != TokenType::Refresh || claims.is_expired_at(Utc::now()) {
            return Err(AuthError::InvalidToken);
        }

        let account_id: AccountId = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        let tokens = issuer.issue_pair(
            &claims.sub,
            self.config.access_ttl()?,
            self.config.session_ttl()?,
        )?;

        self.sessions
            .rotate(&account_id, &device_id, refresh_token, &tokens.refresh)
            .await?;

        Ok(RefreshOutput {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            expires_in: tokens.expires_in,
        })
    }
}
