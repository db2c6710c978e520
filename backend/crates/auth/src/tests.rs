//! Scenario tests for the auth crate, run against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use kernel::id::{AccountId, DeviceId};
use platform::password::HashParams;

use crate::application::{
    AccountDirectory, CheckSessionUseCase, DeleteAccountUseCase, LoginInput, LoginOutput,
    LoginUseCase, LogoutUseCase, RefreshUseCase, RegisterInput, SessionManager,
};
use crate::domain::entity::account::Account;
use crate::domain::repository::{AccountDataPurge, NoAccountData};
use crate::domain::value_object::request_context::RequestContext;
use crate::error::{AuthError, AuthResult};
use crate::infra::memory::MemoryAuthRepository;
use crate::{AppError, AuthConfig, ErrorKind};

const PASSWORD: &str = "Correct-Horse9";

fn test_config() -> Arc<AuthConfig> {
    Arc::new(AuthConfig {
        pepper: b"test-pepper".to_vec(),
        hash_params: HashParams::new(1, 64, 1, 32),
        ..AuthConfig::development()
    })
}

async fn register(
    repo: &Arc<MemoryAuthRepository>,
    config: &Arc<AuthConfig>,
    email: &str,
) -> Account {
    AccountDirectory::new(repo.clone(), config.clone())
        .unwrap()
        .register(RegisterInput {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap()
}

async fn login(
    repo: &Arc<MemoryAuthRepository>,
    config: &Arc<AuthConfig>,
    email: &str,
    device_id: DeviceId,
) -> AuthResult<LoginOutput> {
    LoginUseCase::new(repo.clone(), repo.clone(), config.clone())?
        .execute(LoginInput {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            device_id,
        })
        .await
}

mod registration_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_registration_has_one_winner() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    AccountDirectory::new(repo, config)?
                        .register(RegisterInput {
                            email: "same@example.com".to_string(),
                            password: PASSWORD.to_string(),
                        })
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut taken = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AuthError::EmailTaken) => taken += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(taken, 7);
    }

    #[tokio::test]
    async fn test_email_is_case_sensitive() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();

        let lower = register(&repo, &config, "user@example.com").await;
        let upper = register(&repo, &config, "User@Example.com").await;
        assert_ne!(lower.account_id, upper.account_id);
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let directory = AccountDirectory::new(repo, test_config()).unwrap();

        let err = directory
            .register(RegisterInput {
                email: "weak@example.com".to_string(),
                password: "short".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "known@example.com").await;

        let directory = AccountDirectory::new(repo.clone(), config.clone()).unwrap();
        let unknown = directory
            .authenticate("nobody@example.com", PASSWORD.to_string())
            .await
            .unwrap_err();
        let wrong = directory
            .authenticate("known@example.com", "Wrong-Horse9".to_string())
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_app_error().message(), wrong.to_app_error().message());
    }

    #[tokio::test]
    async fn test_login_replaces_session_for_same_device() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        let account = register(&repo, &config, "dev@example.com").await;
        let device = DeviceId::new();

        let first = login(&repo, &config, "dev@example.com", device).await.unwrap();
        let second = login(&repo, &config, "dev@example.com", device).await.unwrap();
        assert_eq!(repo.session_count(&account.account_id), 1);

        let refresh = RefreshUseCase::new(repo.clone(), config.clone()).unwrap();
        assert!(refresh.execute(&first.refresh_token, device).await.is_err());
        tokio_test::assert_ok!(refresh.execute(&second.refresh_token, device).await);
    }

    #[tokio::test]
    async fn test_sessions_are_per_device() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        let account = register(&repo, &config, "multi@example.com").await;

        login(&repo, &config, "multi@example.com", DeviceId::new()).await.unwrap();
        login(&repo, &config, "multi@example.com", DeviceId::new()).await.unwrap();
        assert_eq!(repo.session_count(&account.account_id), 2);
    }
}

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_rotates_and_stale_token_fails() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "rotate@example.com").await;
        let device = DeviceId::new();

        let initial = login(&repo, &config, "rotate@example.com", device).await.unwrap();
        let refresh = RefreshUseCase::new(repo.clone(), config.clone()).unwrap();

        let rotated = refresh.execute(&initial.refresh_token, device).await.unwrap();
        assert_ne!(rotated.refresh_token, initial.refresh_token);

        let stale = refresh.execute(&initial.refresh_token, device).await.unwrap_err();
        assert!(matches!(stale, AuthError::SessionInvalid));

        // The failed attempt must not have disturbed the current token
        tokio_test::assert_ok!(refresh.execute(&rotated.refresh_token, device).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_with_same_token_has_one_winner() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "race@example.com").await;
        let device = DeviceId::new();
        let initial = login(&repo, &config, "race@example.com", device).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = repo.clone();
                let config = config.clone();
                let token = initial.refresh_token.clone();
                tokio::spawn(async move {
                    RefreshUseCase::new(repo, config)?
                        .execute(&token, device)
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_refresh_on_other_device_fails() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "device@example.com").await;

        let issued = login(&repo, &config, "device@example.com", DeviceId::new())
            .await
            .unwrap();

        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .unwrap()
            .execute(&issued.refresh_token, DeviceId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionInvalid));
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "typ@example.com").await;
        let device = DeviceId::new();

        let issued = login(&repo, &config, "typ@example.com", device).await.unwrap();

        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .unwrap()
            .execute(&issued.access_token, device)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_session_with_zero_ttl_is_never_valid() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = Arc::new(AuthConfig {
            refresh_token_ttl: Duration::ZERO,
            ..(*test_config()).clone()
        });
        let manager = SessionManager::new(repo, config).unwrap();
        let (account, device) = (AccountId::new(), DeviceId::new());

        manager.create(&account, &device, "token").await.unwrap();

        assert!(!manager.validate(&account, &device, "token").await.unwrap());
        // Expired rows still exist until cleaned up
        assert!(manager.exists(&account, &device).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_validates_only_matching_token() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let manager = SessionManager::new(repo, test_config()).unwrap();
        let (account, device) = (AccountId::new(), DeviceId::new());

        manager.create(&account, &device, "token").await.unwrap();

        assert!(manager.validate(&account, &device, "token").await.unwrap());
        assert!(!manager.validate(&account, &device, "other").await.unwrap());
        assert!(!manager.validate(&account, &DeviceId::new(), "token").await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_invalidates_access_token() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "bye@example.com").await;
        let device = DeviceId::new();
        let issued = login(&repo, &config, "bye@example.com", device).await.unwrap();

        let check = CheckSessionUseCase::new(repo.clone(), config.clone()).unwrap();
        let ctx = check.execute(&issued.access_token, device).await.unwrap();
        assert_eq!(ctx.account_id, issued.account_id);

        LogoutUseCase::new(repo.clone(), config.clone())
            .unwrap()
            .execute(&ctx)
            .await
            .unwrap();

        let err = check.execute(&issued.access_token, device).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionInvalid));
    }
}

mod account_tests {
    use super::*;

    struct FailingPurge;

    impl AccountDataPurge for FailingPurge {
        async fn purge_account_data(&self, _account_id: &AccountId) -> AuthResult<u64> {
            Err(AuthError::Store(AppError::unavailable("scan store down")))
        }
    }

    #[tokio::test]
    async fn test_change_password_keeps_sessions() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        let account = register(&repo, &config, "change@example.com").await;
        let device = DeviceId::new();
        let issued = login(&repo, &config, "change@example.com", device).await.unwrap();

        let directory = AccountDirectory::new(repo.clone(), config.clone()).unwrap();
        let wrong = directory
            .change_password(
                &account.account_id,
                "Wrong-Horse9".to_string(),
                "Battery-Staple7".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));

        directory
            .change_password(
                &account.account_id,
                PASSWORD.to_string(),
                "Battery-Staple7".to_string(),
            )
            .await
            .unwrap();

        assert!(directory
            .authenticate("change@example.com", PASSWORD.to_string())
            .await
            .is_err());
        assert!(directory
            .authenticate("change@example.com", "Battery-Staple7".to_string())
            .await
            .is_ok());

        let check = CheckSessionUseCase::new(repo.clone(), config.clone()).unwrap();
        tokio_test::assert_ok!(check.execute(&issued.access_token, device).await);
    }

    #[tokio::test]
    async fn test_require_admin() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        let account = register(&repo, &config, "admin@example.com").await;
        let directory = AccountDirectory::new(repo.clone(), config.clone()).unwrap();

        let err = directory.require_admin(&account.account_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        assert!(repo.set_admin(&account.account_id, true));
        tokio_test::assert_ok!(directory.require_admin(&account.account_id).await);

        let err = directory.require_admin(&AccountId::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAdmin));
    }

    #[tokio::test]
    async fn test_delete_account_revokes_everything() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "gone@example.com").await;
        let device = DeviceId::new();
        let issued = login(&repo, &config, "gone@example.com", device).await.unwrap();
        let ctx = RequestContext::new(issued.account_id, device);

        DeleteAccountUseCase::new(
            repo.clone(),
            repo.clone(),
            Arc::new(NoAccountData),
            config.clone(),
        )
        .unwrap()
        .execute(&ctx)
        .await
        .unwrap();

        assert_eq!(repo.session_count(&issued.account_id), 0);

        let check = CheckSessionUseCase::new(repo.clone(), config.clone()).unwrap();
        assert!(check.execute(&issued.access_token, device).await.is_err());

        let err = login(&repo, &config, "gone@example.com", device).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_delete_account_reports_partial_failure() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let config = test_config();
        register(&repo, &config, "half@example.com").await;
        let device = DeviceId::new();
        let issued = login(&repo, &config, "half@example.com", device).await.unwrap();
        let ctx = RequestContext::new(issued.account_id, device);

        let err = DeleteAccountUseCase::new(
            repo.clone(),
            repo.clone(),
            Arc::new(FailingPurge),
            config.clone(),
        )
        .unwrap()
        .execute(&ctx)
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PartialFailure);
        assert_eq!(repo.session_count(&issued.account_id), 0);

        // Account row survived, so the user can log in and retry
        tokio_test::assert_ok!(login(&repo, &config, "half@example.com", device).await);
    }
}

mod router_tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::presentation::router::auth_router_generic;

    fn app(repo: Arc<MemoryAuthRepository>) -> axum::Router {
        auth_router_generic(repo, Arc::new(NoAccountData), test_config())
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let repo = Arc::new(MemoryAuthRepository::new());
        let device = DeviceId::new();

        let response = app(repo.clone())
            .oneshot(json_request(
                "/register",
                serde_json::json!({ "email": "http@example.com", "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app(repo.clone())
            .oneshot(json_request(
                "/login",
                serde_json::json!({
                    "email": "http@example.com",
                    "password": PASSWORD,
                    "deviceId": device.to_string(),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login = json_body(response).await;
        let access = login["accessToken"].as_str().unwrap().to_string();

        let response = app(repo.clone())
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {access}"))
                    .header("X-Device-ID", device.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let me = json_body(response).await;
        assert_eq!(me["accountId"], login["accountId"]);
        assert_eq!(me["deviceId"], device.to_string());
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = app(Arc::new(MemoryAuthRepository::new()))
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_device_id() {
        let response = app(Arc::new(MemoryAuthRepository::new()))
            .oneshot(json_request(
                "/login",
                serde_json::json!({
                    "email": "x@example.com",
                    "password": PASSWORD,
                    "deviceId": "not-a-uuid",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
