//! Auth Middleware
//!
//! Middleware for requiring authentication on protected routes.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::DeviceId;
use platform::client::{extract_bearer_token, extract_device_id};
use std::sync::Arc;

use crate::application::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::repository::SessionRepository;
use crate::error::AuthError;

/// Middleware state
pub struct AuthMiddlewareState<S>
where
    S: SessionRepository + Send + Sync + 'static,
{
    pub repo: Arc<S>,
    pub config: Arc<AuthConfig>,
}

impl<S> Clone for AuthMiddlewareState<S>
where
    S: SessionRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

/// Middleware that requires a live session
///
/// Reads `Authorization: Bearer <access token>` and `X-Device-ID`, and
/// on success stores a [`RequestContext`](crate::domain::RequestContext)
/// in the request extensions.
pub async fn require_session<S>(
    State(state): State<AuthMiddlewareState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError>
where
    S: SessionRepository + Send + Sync + 'static,
{
    let headers = req.headers();
    let token = extract_bearer_token(headers)?;
    let device_id = DeviceId::from_uuid(extract_device_id(headers)?);

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone())?;
    let ctx = use_case.execute(token, device_id).await?;

    tracing::debug!(
        account_id = %ctx.account_id,
        device_id = %ctx.device_id,
        "Request authenticated"
    );

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
