//! Logout Use Case
//!
//! Ends the caller's session on the current device.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session_manager::SessionManager;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::request_context::RequestContext;
use crate::error::AuthResult;

/// Logout use case
pub struct LogoutUseCase<S>
where
    S: SessionRepository,
{
    sessions: SessionManager<S>,
}

impl<S> LogoutUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        Ok(Self {
            sessions: SessionManager::new(session_repo, config)?,
        })
    }

    pub async fn execute(&self, ctx: &RequestContext) -> AuthResult<()> {
        let deleted = self.sessions.delete(&ctx.account_id, &ctx.device_id).await?;

        tracing::info!(
            account_id = %ctx.account_id,
            device_id = %ctx.device_id,
            deleted,
            "Account signed out"
        );

        Ok(())
    }
}
