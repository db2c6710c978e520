//! HTTP Handlers

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

use kernel::id::DeviceId;
use platform::client::{extract_bearer_token, extract_device_id};

use crate::application::config::AuthConfig;
use crate::application::{
    AccountDirectory, DeleteAccountUseCase, LoginInput, LoginUseCase, LogoutUseCase,
    RefreshUseCase, RegisterInput,
};
use crate::domain::repository::{AccountDataPurge, AccountRepository, SessionRepository};
use crate::domain::value_object::request_context::RequestContext;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RefreshResponse,
    RegisterRequest, RegisterResponse, WhoAmIResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<R, P>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub purge: Arc<P>,
    pub config: Arc<AuthConfig>,
}

// Manual impl: `R` and `P` themselves need not be `Clone`.
impl<R, P> Clone for AuthAppState<R, P>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            purge: self.purge.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Register
// ============================================================================

/// POST /api/auth/register
pub async fn register<R, P>(
    State(state): State<AuthAppState<R, P>>,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let directory = AccountDirectory::new(state.repo.clone(), state.config.clone())?;

    let account = directory
        .register(RegisterInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.account_id.to_string(),
            email: account.email.to_string(),
            created_at: account.created_at,
        }),
    ))
}

// ============================================================================
// Login / Refresh
// ============================================================================

/// POST /api/auth/login
pub async fn login<R, P>(
    State(state): State<AuthAppState<R, P>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let device_id: DeviceId = req
        .device_id
        .parse()
        .map_err(|_| AuthError::InvalidInput("deviceId must be a UUID".to_string()))?;

    let use_case = LoginUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone())?;

    let output = use_case
        .execute(LoginInput {
            email: req.email,
            password: req.password,
            device_id,
        })
        .await?;

    Ok(Json(LoginResponse {
        access_token: output.access_token,
        refresh_token: output.refresh_token,
        expires_in: output.expires_in,
        account_id: output.account_id.to_string(),
    }))
}

/// POST /api/auth/refresh
///
/// `Authorization: Bearer <refresh token>` and `X-Device-ID` required.
pub async fn refresh<R, P>(
    State(state): State<AuthAppState<R, P>>,
    headers: HeaderMap,
) -> AuthResult<Json<RefreshResponse>>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let token = extract_bearer_token(&headers)?;
    let device_id = DeviceId::from_uuid(extract_device_id(&headers)?);

    let use_case = RefreshUseCase::new(state.repo.clone(), state.config.clone())?;
    let output = use_case.execute(token, device_id).await?;

    Ok(Json(RefreshResponse {
        access_token: output.access_token,
        refresh_token: output.refresh_token,
        expires_in: output.expires_in,
    }))
}

// ============================================================================
// Authenticated
// ============================================================================

/// POST /api/auth/logout
pub async fn logout<R, P>(
    State(state): State<AuthAppState<R, P>>,
    Extension(ctx): Extension<RequestContext>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let use_case = LogoutUseCase::new(state.repo.clone(), state.config.clone())?;
    use_case.execute(&ctx).await?;

    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

/// POST /api/auth/change-password
pub async fn change_password<R, P>(
    State(state): State<AuthAppState<R, P>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let directory = AccountDirectory::new(state.repo.clone(), state.config.clone())?;
    directory
        .change_password(&ctx.account_id, req.old_password, req.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed",
    }))
}

/// POST /api/auth/delete
pub async fn delete_account<R, P>(
    State(state): State<AuthAppState<R, P>>,
    Extension(ctx): Extension<RequestContext>,
) -> AuthResult<Json<MessageResponse>>
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let use_case = DeleteAccountUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.purge.clone(),
        state.config.clone(),
    )?;
    use_case.execute(&ctx).await?;

    Ok(Json(MessageResponse {
        message: "Account deleted",
    }))
}

/// GET /api/auth/me
pub async fn who_am_i(Extension(ctx): Extension<RequestContext>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        account_id: ctx.account_id.to_string(),
        device_id: ctx.device_id.to_string(),
    })
}
