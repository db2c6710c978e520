//! Scenario tests for the redemption crate, run against the in-memory stores

use std::sync::Arc;

use auth::application::{AccountDirectory, RegisterInput};
use auth::{AuthConfig, MemoryAuthRepository, RequestContext};
use chrono::{Duration, Utc};
use kernel::id::{AccountId, DeviceId, QrCodeId};
use platform::password::HashParams;

use crate::application::{
    AccountScanPurge, CreateCodeInput, ManageActionsUseCase, ManageCodesUseCase, RedeemUseCase,
    RedemptionConfig,
};
use crate::domain::entities::{QrAction, QrCode, UserQrScan};
use crate::domain::repository::{QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::{CounterUpdate, UsagePolicy};
use crate::error::{RedemptionError, RedemptionResult};
use crate::infra::memory::MemoryRedemptionRepository;
use crate::{AppError, ErrorKind};

const PASSWORD: &str = "Correct-Horse9";
const PAYLOAD: &str = r#"{"type":"reward","points":10}"#;

struct Fixture {
    accounts: Arc<MemoryAuthRepository>,
    repo: Arc<MemoryRedemptionRepository>,
    auth_config: Arc<AuthConfig>,
    config: Arc<RedemptionConfig>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            accounts: Arc::new(MemoryAuthRepository::new()),
            repo: Arc::new(MemoryRedemptionRepository::new()),
            auth_config: Arc::new(AuthConfig {
                hash_params: HashParams::new(1, 64, 1, 32),
                ..AuthConfig::development()
            }),
            config: Arc::new(RedemptionConfig::default()),
        }
    }

    async fn account(&self, email: &str, admin: bool) -> RequestContext {
        let account = AccountDirectory::new(self.accounts.clone(), self.auth_config.clone())
            .unwrap()
            .register(RegisterInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        if admin {
            self.accounts.set_admin(&account.account_id, true);
        }
        RequestContext::new(account.account_id, DeviceId::new())
    }

    fn actions(&self) -> ManageActionsUseCase<MemoryRedemptionRepository, MemoryAuthRepository> {
        ManageActionsUseCase::new(
            self.repo.clone(),
            self.accounts.clone(),
            self.auth_config.clone(),
            self.config.clone(),
        )
        .unwrap()
    }

    fn codes(
        &self,
    ) -> ManageCodesUseCase<
        MemoryRedemptionRepository,
        MemoryRedemptionRepository,
        MemoryRedemptionRepository,
        MemoryAuthRepository,
    > {
        ManageCodesUseCase::new(
            self.repo.clone(),
            self.repo.clone(),
            self.repo.clone(),
            self.accounts.clone(),
            self.auth_config.clone(),
            self.config.clone(),
        )
        .unwrap()
    }

    fn redeemer(
        &self,
    ) -> RedeemUseCase<
        MemoryRedemptionRepository,
        MemoryRedemptionRepository,
        MemoryRedemptionRepository,
    > {
        redeemer(&self.repo, &self.config)
    }

    fn purge(
        &self,
    ) -> Arc<AccountScanPurge<MemoryRedemptionRepository, MemoryRedemptionRepository>> {
        Arc::new(AccountScanPurge::new(
            self.repo.clone(),
            self.repo.clone(),
            self.config.clone(),
        ))
    }

    async fn code(&self, admin: &RequestContext, policy: UsagePolicy, max_usages: i64) -> QrCode {
        let action = self.actions().create(admin, PAYLOAD.to_string()).await.unwrap();
        self.codes()
            .create(
                admin,
                CreateCodeInput {
                    action_id: action.id,
                    policy,
                    max_usages,
                    expires_at: Utc::now() + Duration::hours(1),
                },
            )
            .await
            .unwrap()
    }

    async fn scan_count(&self, account_id: &AccountId, code_id: &QrCodeId) -> i64 {
        self.repo
            .find(account_id, code_id)
            .await
            .unwrap()
            .map(|scan| scan.count)
            .unwrap_or(0)
    }
}

fn redeemer(
    repo: &Arc<MemoryRedemptionRepository>,
    config: &Arc<RedemptionConfig>,
) -> RedeemUseCase<
    MemoryRedemptionRepository,
    MemoryRedemptionRepository,
    MemoryRedemptionRepository,
> {
    RedeemUseCase::new(repo.clone(), repo.clone(), repo.clone(), config.clone())
}

/// Memory store that can fail chosen deletes or answer slowly
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryRedemptionRepository,
    fail_scan_delete: bool,
    fail_code_delete: bool,
    delay: Option<std::time::Duration>,
}

impl FlakyStore {
    fn over(repo: &Arc<MemoryRedemptionRepository>) -> Self {
        Self {
            inner: repo.as_ref().clone(),
            ..Self::default()
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn store_offline() -> RedemptionError {
    RedemptionError::Store(AppError::unavailable("store offline"))
}

impl QrCodeRepository for FlakyStore {
    async fn insert_if_absent(&self, code: &QrCode) -> RedemptionResult<bool> {
        self.pause().await;
        QrCodeRepository::insert_if_absent(&self.inner, code).await
    }

    async fn find_by_id(&self, code_id: &QrCodeId) -> RedemptionResult<Option<QrCode>> {
        self.pause().await;
        QrCodeRepository::find_by_id(&self.inner, code_id).await
    }

    async fn delete(&self, code_id: &QrCodeId) -> RedemptionResult<bool> {
        self.pause().await;
        if self.fail_code_delete {
            return Err(store_offline());
        }
        QrCodeRepository::delete(&self.inner, code_id).await
    }

    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrCode>> {
        self.pause().await;
        QrCodeRepository::list_up_to(&self.inner, limit).await
    }

    async fn atomic_increment_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        self.pause().await;
        self.inner
            .atomic_increment_redemptions(code_id, expected_prior)
            .await
    }

    async fn atomic_release_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
        amount: i64,
    ) -> RedemptionResult<CounterUpdate> {
        self.pause().await;
        self.inner
            .atomic_release_redemptions(code_id, expected_prior, amount)
            .await
    }
}

impl UserQrScanRepository for FlakyStore {
    async fn insert_if_absent(&self, scan: &UserQrScan) -> RedemptionResult<bool> {
        self.pause().await;
        UserQrScanRepository::insert_if_absent(&self.inner, scan).await
    }

    async fn find(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
    ) -> RedemptionResult<Option<UserQrScan>> {
        self.pause().await;
        self.inner.find(account_id, code_id).await
    }

    async fn sum_counts_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<i64> {
        self.pause().await;
        self.inner.sum_counts_for_code(code_id).await
    }

    async fn atomic_increment(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        self.pause().await;
        self.inner
            .atomic_increment(account_id, code_id, expected_prior)
            .await
    }

    async fn atomic_decrement(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        self.pause().await;
        self.inner
            .atomic_decrement(account_id, code_id, expected_prior)
            .await
    }

    async fn list_for_account(&self, account_id: &AccountId) -> RedemptionResult<Vec<UserQrScan>> {
        self.pause().await;
        self.inner.list_for_account(account_id).await
    }

    async fn delete_all_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<u64> {
        self.pause().await;
        if self.fail_scan_delete {
            return Err(store_offline());
        }
        self.inner.delete_all_for_code(code_id).await
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> RedemptionResult<u64> {
        self.pause().await;
        self.inner.delete_all_for_account(account_id).await
    }
}

mod redeem_tests {
    use super::*;

    #[tokio::test]
    async fn test_redeem_returns_payload_and_counts() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        let payload = fx.redeemer().execute(&code.id, &user.account_id).await.unwrap();
        assert_eq!(payload.as_str(), PAYLOAD);
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .redeemer()
            .execute(&QrCodeId::new(), &AccountId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::CodeNotFound));
    }

    #[tokio::test]
    async fn test_per_account_limit_sequential() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let other = fx.account("other@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 3).await;
        let redeemer = fx.redeemer();

        for _ in 0..3 {
            redeemer.execute(&code.id, &user.account_id).await.unwrap();
        }
        let err = redeemer.execute(&code.id, &user.account_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 3);

        // Another account has its own allowance
        tokio_test::assert_ok!(redeemer.execute(&code.id, &other.account_id).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_per_account_limit_concurrent() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 3).await;

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let redeemer = fx.redeemer();
                let (code_id, account_id) = (code.id, user.account_id);
                tokio::spawn(async move { redeemer.execute(&code_id, &account_id).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(
                    matches!(e, RedemptionError::LimitExceeded | RedemptionError::Contention(_)),
                    "unexpected error: {e}"
                ),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_global_limit_across_accounts() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let code = fx.code(&admin, UsagePolicy::Global, 5).await;

        let mut users = Vec::new();
        for i in 0..10 {
            users.push(fx.account(&format!("user{i}@example.com"), false).await);
        }

        let handles: Vec<_> = users
            .iter()
            .map(|user| {
                let redeemer = fx.redeemer();
                let (code_id, account_id) = (code.id, user.account_id);
                tokio::spawn(async move {
                    let mut succeeded = 0;
                    for _ in 0..3 {
                        if redeemer.execute(&code_id, &account_id).await.is_ok() {
                            succeeded += 1;
                        }
                    }
                    succeeded
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            succeeded += handle.await.unwrap();
        }

        let mut total = 0;
        for user in &users {
            let count = fx.scan_count(&user.account_id, &code.id).await;
            assert!(count <= 2, "account redeemed {count} times");
            total += count;
        }

        assert_eq!(succeeded, 5);
        assert_eq!(total, 5);
        let stored = QrCodeRepository::find_by_id(fx.repo.as_ref(), &code.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.redemptions, 5);
    }

    #[tokio::test]
    async fn test_global_allows_two_per_account() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::Global, 10).await;
        let redeemer = fx.redeemer();

        redeemer.execute(&code.id, &user.account_id).await.unwrap();
        redeemer.execute(&code.id, &user.account_id).await.unwrap();
        let err = redeemer.execute(&code.id, &user.account_id).await.unwrap_err();
        assert!(matches!(err, RedemptionError::LimitExceeded));
    }

    #[tokio::test]
    async fn test_expired_code_is_deleted() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let live = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        let expired = QrCode::new(
            live.action_id,
            UsagePolicy::PerAccount,
            0,
            Utc::now() - Duration::seconds(1),
        );
        assert!(QrCodeRepository::insert_if_absent(fx.repo.as_ref(), &expired)
            .await
            .unwrap());

        let err = fx
            .redeemer()
            .execute(&expired.id, &user.account_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);

        let gone = QrCodeRepository::find_by_id(fx.repo.as_ref(), &expired.id)
            .await
            .unwrap();
        assert!(gone.is_none());
        assert_eq!(fx.repo.scan_rows_for_code(&expired.id), 0);

        let err = fx
            .redeemer()
            .execute(&expired.id, &user.account_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::CodeNotFound));
    }

    #[tokio::test]
    async fn test_orphaned_code_reports_missing_action() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        fx.actions().delete(&admin, &code.action_id).await.unwrap();

        let err = fx
            .redeemer()
            .execute(&code.id, &user.account_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::ActionNotFound));
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 0);
    }
}

mod management_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let fx = Fixture::new();
        let user = fx.account("user@example.com", false).await;

        let err = fx.actions().create(&user, PAYLOAD.to_string()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = fx.codes().list(&user, 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_action_payload_must_be_json() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;

        let err = fx
            .actions()
            .create(&admin, "not json".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_action_lifecycle() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let actions = fx.actions();

        let created = actions.create(&admin, PAYLOAD.to_string()).await.unwrap();
        let fetched = actions.get(&admin, &created.id).await.unwrap();
        assert_eq!(fetched.payload, created.payload);

        actions.delete(&admin, &created.id).await.unwrap();
        let err = actions.delete(&admin, &created.id).await.unwrap_err();
        assert!(matches!(err, RedemptionError::ActionNotFound));
    }

    #[tokio::test]
    async fn test_code_creation_validation() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let action = fx.actions().create(&admin, PAYLOAD.to_string()).await.unwrap();
        let codes = fx.codes();

        let missing = QrAction::new(action.payload.clone());
        let err = codes
            .create(
                &admin,
                CreateCodeInput {
                    action_id: missing.id,
                    policy: UsagePolicy::Global,
                    max_usages: 1,
                    expires_at: Utc::now() + Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::ActionNotFound));

        let err = codes
            .create(
                &admin,
                CreateCodeInput {
                    action_id: action.id,
                    policy: UsagePolicy::Global,
                    max_usages: 1,
                    expires_at: Utc::now() - Duration::minutes(1),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = codes
            .create(
                &admin,
                CreateCodeInput {
                    action_id: action.id,
                    policy: UsagePolicy::PerAccount,
                    max_usages: -1,
                    expires_at: Utc::now() + Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_delete_code_removes_scans() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        fx.redeemer().execute(&code.id, &user.account_id).await.unwrap();
        assert_eq!(fx.repo.scan_rows_for_code(&code.id), 1);

        fx.codes().delete(&admin, &code.id).await.unwrap();
        assert_eq!(fx.repo.scan_rows_for_code(&code.id), 0);

        let err = fx.codes().delete(&admin, &code.id).await.unwrap_err();
        assert!(matches!(err, RedemptionError::CodeNotFound));
    }

    #[tokio::test]
    async fn test_list_is_bounded() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        for _ in 0..3 {
            fx.code(&admin, UsagePolicy::PerAccount, 1).await;
        }

        assert_eq!(fx.codes().list(&admin, 2).await.unwrap().len(), 2);
        assert_eq!(fx.actions().list(&admin, 10).await.unwrap().len(), 3);

        let err = fx.codes().list(&admin, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = fx.actions().list(&admin, 1001).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

mod store_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_code_reported_even_if_cleanup_fails() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let live = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        let expired = QrCode::new(
            live.action_id,
            UsagePolicy::PerAccount,
            0,
            Utc::now() - Duration::seconds(1),
        );
        assert!(QrCodeRepository::insert_if_absent(fx.repo.as_ref(), &expired)
            .await
            .unwrap());

        let scans = Arc::new(FlakyStore {
            fail_scan_delete: true,
            ..FlakyStore::over(&fx.repo)
        });
        let err = RedeemUseCase::new(fx.repo.clone(), fx.repo.clone(), scans, fx.config.clone())
            .execute(&expired.id, &user.account_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::CodeExpired));

        // Cleanup stopped before the code row
        let kept = QrCodeRepository::find_by_id(fx.repo.as_ref(), &expired.id)
            .await
            .unwrap();
        assert!(kept.is_some());
    }

    #[tokio::test]
    async fn test_slow_store_is_unavailable_and_retryable() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        let slow = Arc::new(FlakyStore {
            delay: Some(std::time::Duration::from_millis(50)),
            ..FlakyStore::over(&fx.repo)
        });
        let config = Arc::new(RedemptionConfig {
            store_timeout: std::time::Duration::from_millis(1),
            ..RedemptionConfig::default()
        });

        let err = RedeemUseCase::new(fx.repo.clone(), slow.clone(), slow, config)
            .execute(&code.id, &user.account_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RedemptionError::StoreUnavailable(_)));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.is_retryable());
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 0);
    }

    #[tokio::test]
    async fn test_delete_code_reports_partial_failure() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;
        fx.redeemer().execute(&code.id, &user.account_id).await.unwrap();

        let codes = Arc::new(FlakyStore {
            fail_code_delete: true,
            ..FlakyStore::over(&fx.repo)
        });
        let err = ManageCodesUseCase::new(
            fx.repo.clone(),
            codes,
            fx.repo.clone(),
            fx.accounts.clone(),
            fx.auth_config.clone(),
            fx.config.clone(),
        )
        .unwrap()
        .delete(&admin, &code.id)
        .await
        .unwrap_err();
        assert!(matches!(err, RedemptionError::PartialFailure(_)));
        assert_eq!(err.kind(), ErrorKind::PartialFailure);

        assert_eq!(fx.repo.scan_rows_for_code(&code.id), 0);
        let kept = QrCodeRepository::find_by_id(fx.repo.as_ref(), &code.id)
            .await
            .unwrap();
        assert!(kept.is_some());

        // Repeating the call finishes the job
        tokio_test::assert_ok!(fx.codes().delete(&admin, &code.id).await);
    }
}

mod account_deletion_tests {
    use super::*;
    use auth::application::DeleteAccountUseCase;

    #[tokio::test]
    async fn test_account_deletion_purges_scans() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 0).await;

        fx.redeemer().execute(&code.id, &user.account_id).await.unwrap();
        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 1);

        delete_account(&fx, &user).await;

        assert_eq!(fx.scan_count(&user.account_id, &code.id).await, 0);
        assert_eq!(fx.repo.scan_rows_for_code(&code.id), 0);
    }

    #[tokio::test]
    async fn test_account_deletion_returns_global_quota() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let first = fx.account("first@example.com", false).await;
        let second = fx.account("second@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::Global, 2).await;
        let redeemer = fx.redeemer();

        redeemer.execute(&code.id, &first.account_id).await.unwrap();
        redeemer.execute(&code.id, &first.account_id).await.unwrap();
        let err = redeemer.execute(&code.id, &second.account_id).await.unwrap_err();
        assert!(matches!(err, RedemptionError::LimitExceeded));

        delete_account(&fx, &first).await;

        assert_eq!(fx.repo.sum_counts_for_code(&code.id).await.unwrap(), 0);
        let stored = QrCodeRepository::find_by_id(fx.repo.as_ref(), &code.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.redemptions, 0);

        tokio_test::assert_ok!(redeemer.execute(&code.id, &second.account_id).await);
        tokio_test::assert_ok!(redeemer.execute(&code.id, &second.account_id).await);
        let err = redeemer.execute(&code.id, &second.account_id).await.unwrap_err();
        assert!(matches!(err, RedemptionError::LimitExceeded));
    }

    #[tokio::test]
    async fn test_account_deletion_leaves_per_account_codes_alone() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let user = fx.account("user@example.com", false).await;
        let code = fx.code(&admin, UsagePolicy::PerAccount, 5).await;

        fx.redeemer().execute(&code.id, &user.account_id).await.unwrap();
        delete_account(&fx, &user).await;

        let stored = QrCodeRepository::find_by_id(fx.repo.as_ref(), &code.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.redemptions, 0);
    }

    async fn delete_account(fx: &Fixture, ctx: &RequestContext) {
        DeleteAccountUseCase::new(
            fx.accounts.clone(),
            fx.accounts.clone(),
            fx.purge(),
            fx.auth_config.clone(),
        )
        .unwrap()
        .execute(ctx)
        .await
        .unwrap();
    }
}

mod router_tests {
    use super::*;
    use auth::middleware::{AuthMiddlewareState, require_session};
    use auth::{NoAccountData, auth_router_generic};
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::presentation::router::qr_router_generic;

    fn app(fx: &Fixture) -> Router {
        let session_guard = AuthMiddlewareState {
            repo: fx.accounts.clone(),
            config: fx.auth_config.clone(),
        };

        Router::new()
            .nest(
                "/api/auth",
                auth_router_generic(
                    fx.accounts.clone(),
                    Arc::new(NoAccountData),
                    fx.auth_config.clone(),
                ),
            )
            .nest(
                "/api/qr",
                qr_router_generic(
                    fx.repo.clone(),
                    fx.accounts.clone(),
                    fx.auth_config.clone(),
                    fx.config.clone(),
                )
                .route_layer(axum::middleware::from_fn_with_state(
                    session_guard,
                    require_session::<MemoryAuthRepository>,
                )),
            )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(fx: &Fixture, email: &str, device: DeviceId) -> String {
        let response = app(fx)
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "email": email,
                            "password": PASSWORD,
                            "deviceId": device.to_string(),
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["accessToken"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn authed(
        method: &str,
        uri: &str,
        token: &str,
        device: DeviceId,
        body: Option<serde_json::Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("X-Device-ID", device.to_string());
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_admin_creates_code_and_user_redeems() {
        let fx = Fixture::new();
        fx.account("admin@example.com", true).await;
        fx.account("user@example.com", false).await;

        let admin_device = DeviceId::new();
        let admin_token = login(&fx, "admin@example.com", admin_device).await;

        let response = app(&fx)
            .oneshot(authed(
                "POST",
                "/api/qr/actions",
                &admin_token,
                admin_device,
                Some(serde_json::json!({ "payload": PAYLOAD })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let action_id = body_json(response).await["qrActionId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app(&fx)
            .oneshot(authed(
                "POST",
                "/api/qr/codes",
                &admin_token,
                admin_device,
                Some(serde_json::json!({
                    "actionId": action_id,
                    "usagePolicy": "perAccount",
                    "maxUsages": 1,
                    "expiresInMinutes": 60,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let code_id = body_json(response).await["qrCodeId"]
            .as_str()
            .unwrap()
            .to_string();

        let user_device = DeviceId::new();
        let user_token = login(&fx, "user@example.com", user_device).await;
        let redeem_uri = format!("/api/qr/redeem?qrCodeId={code_id}");

        let response = app(&fx)
            .oneshot(authed("GET", &redeem_uri, &user_token, user_device, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["points"], 10);

        let response = app(&fx)
            .oneshot(authed("GET", &redeem_uri, &user_token, user_device, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app(&fx)
            .oneshot(authed("GET", "/api/qr/codes?count=10", &user_token, user_device, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_rejected() {
        let fx = Fixture::new();
        let admin = fx.account("admin@example.com", true).await;
        let action = fx.actions().create(&admin, PAYLOAD.to_string()).await.unwrap();

        let device = DeviceId::new();
        let token = login(&fx, "admin@example.com", device).await;

        let response = app(&fx)
            .oneshot(authed(
                "POST",
                "/api/qr/codes",
                &token,
                device,
                Some(serde_json::json!({
                    "actionId": action.id.to_string(),
                    "usagePolicy": "global",
                    "maxUsages": 1,
                    "expiresInMinutes": 100_000_000_000_000i64,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(fx.codes().list(&admin, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redeem_requires_session() {
        let fx = Fixture::new();
        let response = app(&fx)
            .oneshot(
                Request::get(format!("/api/qr/redeem?qrCodeId={}", QrCodeId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
