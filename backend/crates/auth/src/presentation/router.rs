//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::{AccountDataPurge, AccountRepository, SessionRepository};
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{AuthMiddlewareState, require_session};

/// Create the Auth router with PostgreSQL repository
pub fn auth_router<P>(repo: PgAuthRepository, purge: Arc<P>, config: Arc<AuthConfig>) -> Router
where
    P: AccountDataPurge + Send + Sync + 'static,
{
    auth_router_generic(Arc::new(repo), purge, config)
}

/// Create a generic Auth router for any repository implementation
///
/// `/register`, `/login` and `/refresh` are public; everything else
/// requires a live session.
pub fn auth_router_generic<R, P>(repo: Arc<R>, purge: Arc<P>, config: Arc<AuthConfig>) -> Router
where
    R: AccountRepository + SessionRepository + Send + Sync + 'static,
    P: AccountDataPurge + Send + Sync + 'static,
{
    let session_guard = AuthMiddlewareState {
        repo: repo.clone(),
        config: config.clone(),
    };
    let state = AuthAppState {
        repo,
        purge,
        config,
    };

    let protected = Router::new()
        .route("/logout", post(handlers::logout::<R, P>))
        .route("/change-password", post(handlers::change_password::<R, P>))
        .route("/delete", post(handlers::delete_account::<R, P>))
        .route("/me", get(handlers::who_am_i))
        .route_layer(middleware::from_fn_with_state(
            session_guard,
            require_session::<R>,
        ));

    Router::new()
        .route("/register", post(handlers::register::<R, P>))
        .route("/login", post(handlers::login::<R, P>))
        .route("/refresh", post(handlers::refresh::<R, P>))
        .merge(protected)
        .with_state(state)
}
