//! HTTP Handlers
//!
//! Every route here sits behind the auth session middleware, so a
//! `RequestContext` is always present.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

use auth::RequestContext;
use auth::config::AuthConfig;
use auth::domain::AccountRepository;
use chrono::{Duration, Utc};
use kernel::id::{QrActionId, QrCodeId};

use crate::application::config::RedemptionConfig;
use crate::application::{CreateCodeInput, ManageActionsUseCase, ManageCodesUseCase, RedeemUseCase};
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::error::{RedemptionError, RedemptionResult};
use crate::presentation::dto::{
    ActionResponse, CodeResponse, CreateActionRequest, CreateActionResponse, CreateCodeRequest,
    CreateCodeResponse, ListQuery, RedeemQuery,
};

/// Shared state for QR handlers
pub struct QrAppState<R, A>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub accounts: Arc<A>,
    pub auth_config: Arc<AuthConfig>,
    pub config: Arc<RedemptionConfig>,
}

impl<R, A> Clone for QrAppState<R, A>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            accounts: self.accounts.clone(),
            auth_config: self.auth_config.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, A> QrAppState<R, A>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    fn actions(&self) -> RedemptionResult<ManageActionsUseCase<R, A>> {
        ManageActionsUseCase::new(
            self.repo.clone(),
            self.accounts.clone(),
            self.auth_config.clone(),
            self.config.clone(),
        )
    }

    fn codes(&self) -> RedemptionResult<ManageCodesUseCase<R, R, R, A>> {
        ManageCodesUseCase::new(
            self.repo.clone(),
            self.repo.clone(),
            self.repo.clone(),
            self.accounts.clone(),
            self.auth_config.clone(),
            self.config.clone(),
        )
    }
}

fn parse_id<T>(raw: &str, field: &str) -> RedemptionResult<kernel::id::Id<T>> {
    raw.parse()
        .map_err(|_| RedemptionError::InvalidInput(format!("{field} must be a UUID")))
}

// ============================================================================
// Redemption
// ============================================================================

/// GET /api/qr/redeem?qrCodeId=...
///
/// Responds with the action payload as stored.
pub async fn redeem<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<RedeemQuery>,
) -> RedemptionResult<impl IntoResponse>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let code_id: QrCodeId = parse_id(&query.qr_code_id, "qrCodeId")?;

    let use_case = RedeemUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );
    let payload = use_case.execute(&code_id, &ctx.account_id).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        payload.into_string(),
    ))
}

// ============================================================================
// Actions (admin)
// ============================================================================

/// POST /api/qr/actions
pub async fn create_action<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateActionRequest>,
) -> RedemptionResult<impl IntoResponse>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let action = state.actions()?.create(&ctx, req.payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateActionResponse {
            qr_action_id: action.id.to_string(),
        }),
    ))
}

/// GET /api/qr/actions?count=n
pub async fn list_actions<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> RedemptionResult<Json<Vec<ActionResponse>>>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let actions = state.actions()?.list(&ctx, query.count).await?;
    Ok(Json(actions.into_iter().map(ActionResponse::from).collect()))
}

/// GET /api/qr/actions/{id}
pub async fn get_action<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> RedemptionResult<Json<ActionResponse>>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let action_id: QrActionId = parse_id(&id, "id")?;
    let action = state.actions()?.get(&ctx, &action_id).await?;
    Ok(Json(action.into()))
}

/// DELETE /api/qr/actions/{id}
pub async fn delete_action<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> RedemptionResult<StatusCode>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let action_id: QrActionId = parse_id(&id, "id")?;
    state.actions()?.delete(&ctx, &action_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Codes (admin)
// ============================================================================

/// POST /api/qr/codes
pub async fn create_code<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateCodeRequest>,
) -> RedemptionResult<impl IntoResponse>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let action_id: QrActionId = parse_id(&req.action_id, "actionId")?;
    let expires_at = Duration::try_minutes(req.expires_in_minutes)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            RedemptionError::InvalidInput("expiresInMinutes out of range".to_string())
        })?;

    let code = state
        .codes()?
        .create(
            &ctx,
            CreateCodeInput {
                action_id,
                policy: req.usage_policy,
                max_usages: req.max_usages,
                expires_at,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCodeResponse {
            qr_code_id: code.id.to_string(),
        }),
    ))
}

/// GET /api/qr/codes?count=n
pub async fn list_codes<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> RedemptionResult<Json<Vec<CodeResponse>>>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let codes = state.codes()?.list(&ctx, query.count).await?;
    Ok(Json(codes.into_iter().map(CodeResponse::from).collect()))
}

/// DELETE /api/qr/codes/{id}
pub async fn delete_code<R, A>(
    State(state): State<QrAppState<R, A>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> RedemptionResult<StatusCode>
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let code_id: QrCodeId = parse_id(&id, "id")?;
    state.codes()?.delete(&ctx, &code_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
