//! QR Router

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

use auth::PgAuthRepository;
use auth::config::AuthConfig;
use auth::domain::AccountRepository;

use crate::application::config::RedemptionConfig;
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::infra::postgres::PgRedemptionRepository;
use crate::presentation::handlers::{self, QrAppState};

/// Create the QR router with PostgreSQL repositories
///
/// Routes expect a `RequestContext` extension; mount behind the auth
/// session middleware.
pub fn qr_router(
    repo: PgRedemptionRepository,
    accounts: Arc<PgAuthRepository>,
    auth_config: Arc<AuthConfig>,
    config: Arc<RedemptionConfig>,
) -> Router {
    qr_router_generic(Arc::new(repo), accounts, auth_config, config)
}

/// Create a generic QR router for any repository implementation
pub fn qr_router_generic<R, A>(
    repo: Arc<R>,
    accounts: Arc<A>,
    auth_config: Arc<AuthConfig>,
    config: Arc<RedemptionConfig>,
) -> Router
where
    R: QrActionRepository + QrCodeRepository + UserQrScanRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let state = QrAppState {
        repo,
        accounts,
        auth_config,
        config,
    };

    Router::new()
        .route("/redeem", get(handlers::redeem::<R, A>))
        .route(
            "/actions",
            post(handlers::create_action::<R, A>).get(handlers::list_actions::<R, A>),
        )
        .route(
            "/actions/{id}",
            get(handlers::get_action::<R, A>).delete(handlers::delete_action::<R, A>),
        )
        .route(
            "/codes",
            post(handlers::create_code::<R, A>).get(handlers::list_codes::<R, A>),
        )
        .route("/codes/{id}", delete(handlers::delete_code::<R, A>))
        .with_state(state)
}
