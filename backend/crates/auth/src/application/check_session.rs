//! Check Session Use Case
//!
//! Resolves the caller of an authenticated request from its access
//! token and device id.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AccountId, DeviceId};
use platform::token::TokenType;

use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::request_context::RequestContext;
use crate::error::{AuthError, AuthResult};

/// Check session use case
pub struct CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    sessions: SessionManager<S>,
    config: Arc<AuthConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        Ok(Self {
            sessions: SessionManager::new(session_repo, config.clone())?,
            config,
        })
    }

    /// Accept an unexpired access token whose session still exists
    ///
    /// Only presence of the session row is checked, so logout and account
    /// deletion take effect on the next request.
    pub async fn execute(
        &self,
        access_token: &str,
        device_id: DeviceId,
    ) -> AuthResult<RequestContext> {
        let claims = self.config.token_issuer().parse(access_token)?;

        if claims.token_type() != TokenType::Access || claims.is_expired_at(Utc::now()) {
            return Err(AuthError::InvalidToken);
        }

        let account_id: AccountId = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        if !self.sessions.exists(&account_id, &device_id).await? {
            return Err(AuthError::SessionInvalid);
        }

        Ok(RequestContext::new(account_id, device_id))
    }
}
