//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, QrActionId, QrCodeId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{QrAction, QrCode, UserQrScan};
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::{ActionPayload, CounterUpdate, UsagePolicy};
use crate::error::RedemptionResult;

/// PostgreSQL-backed redemption repository
#[derive(Clone)]
pub struct PgRedemptionRepository {
    pool: PgPool,
}

impl PgRedemptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove expired codes and their scan counters
    ///
    /// Scans go first so a failure midway never leaves counters behind a
    /// deleted code.
    pub async fn cleanup_expired(&self) -> RedemptionResult<(u64, u64)> {
        let now = Utc::now();

        let scans_deleted = sqlx::query(
            r#"
            DELETE FROM user_qr_scans
            WHERE qr_code_id IN (SELECT qr_code_id FROM qr_codes WHERE expires_at < $1)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let codes_deleted = sqlx::query("DELETE FROM qr_codes WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(
            codes = codes_deleted,
            scans = scans_deleted,
            "Cleaned up expired QR codes"
        );

        Ok((codes_deleted, scans_deleted))
    }
}

fn counter_update(row: Option<(i64,)>) -> CounterUpdate {
    match row {
        Some((value,)) => CounterUpdate::Applied(value),
        None => CounterUpdate::Conflict,
    }
}

// ============================================================================
// QR Action Repository Implementation
// ============================================================================

impl QrActionRepository for PgRedemptionRepository {
    async fn insert_if_absent(&self, action: &QrAction) -> RedemptionResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO qr_actions (qr_action_id, payload, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (qr_action_id) DO NOTHING
            "#,
        )
        .bind(action.id.as_uuid())
        .bind(action.payload.as_str())
        .bind(action.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, action_id: &QrActionId) -> RedemptionResult<Option<QrAction>> {
        let row = sqlx::query_as::<_, ActionRow>(
            "SELECT qr_action_id, payload, created_at FROM qr_actions WHERE qr_action_id = $1",
        )
        .bind(action_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ActionRow::into_action))
    }

    async fn delete(&self, action_id: &QrActionId) -> RedemptionResult<bool> {
        let result = sqlx::query("DELETE FROM qr_actions WHERE qr_action_id = $1")
            .bind(action_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrAction>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT qr_action_id, payload, created_at
            FROM qr_actions
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActionRow::into_action).collect())
    }
}

// ============================================================================
// QR Code Repository Implementation
// ============================================================================

impl QrCodeRepository for PgRedemptionRepository {
    async fn insert_if_absent(&self, code: &QrCode) -> RedemptionResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO qr_codes (
                qr_code_id,
                qr_action_id,
                usage_policy,
                max_usages,
                redemptions,
                expires_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (qr_code_id) DO NOTHING
            "#,
        )
        .bind(code.id.as_uuid())
        .bind(code.action_id.as_uuid())
        .bind(code.policy.as_str())
        .bind(code.max_usages)
        .bind(code.redemptions)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, code_id: &QrCodeId) -> RedemptionResult<Option<QrCode>> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT qr_code_id, qr_action_id, usage_policy, max_usages, redemptions,
                   expires_at, created_at
            FROM qr_codes
            WHERE qr_code_id = $1
            "#,
        )
        .bind(code_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CodeRow::into_code).transpose()
    }

    async fn delete(&self, code_id: &QrCodeId) -> RedemptionResult<bool> {
        let result = sqlx::query("DELETE FROM qr_codes WHERE qr_code_id = $1")
            .bind(code_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrCode>> {
        let rows = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT qr_code_id, qr_action_id, usage_policy, max_usages, redemptions,
                   expires_at, created_at
            FROM qr_codes
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CodeRow::into_code).collect()
    }

    async fn atomic_increment_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE qr_codes
            SET redemptions = redemptions + 1
            WHERE qr_code_id = $1 AND redemptions = $2
            RETURNING redemptions
            "#,
        )
        .bind(code_id.as_uuid())
        .bind(expected_prior)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counter_update(row))
    }

    async fn atomic_release_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
        amount: i64,
    ) -> RedemptionResult<CounterUpdate> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE qr_codes
            SET redemptions = GREATEST(redemptions - $3, 0)
            WHERE qr_code_id = $1 AND redemptions = $2
            RETURNING redemptions
            "#,
        )
        .bind(code_id.as_uuid())
        .bind(expected_prior)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counter_update(row))
    }
}

// ============================================================================
// User QR Scan Repository Implementation
// ============================================================================

impl UserQrScanRepository for PgRedemptionRepository {
    async fn insert_if_absent(&self, scan: &UserQrScan) -> RedemptionResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_qr_scans (account_id, qr_code_id, count)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, qr_code_id) DO NOTHING
            "#,
        )
        .bind(scan.account_id.as_uuid())
        .bind(scan.code_id.as_uuid())
        .bind(scan.count)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
    ) -> RedemptionResult<Option<UserQrScan>> {
        let row = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT account_id, qr_code_id, count
            FROM user_qr_scans
            WHERE account_id = $1 AND qr_code_id = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(code_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ScanRow::into_scan))
    }

    async fn sum_counts_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<i64> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(count), 0)::BIGINT FROM user_qr_scans WHERE qr_code_id = $1",
        )
        .bind(code_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    async fn atomic_increment(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE user_qr_scans
            SET count = count + 1
            WHERE account_id = $1 AND qr_code_id = $2 AND count = $3
            RETURNING count
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(code_id.as_uuid())
        .bind(expected_prior)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counter_update(row))
    }

    async fn atomic_decrement(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE user_qr_scans
            SET count = count - 1
            WHERE account_id = $1 AND qr_code_id = $2 AND count = $3 AND count > 0
            RETURNING count
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(code_id.as_uuid())
        .bind(expected_prior)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counter_update(row))
    }

    async fn list_for_account(&self, account_id: &AccountId) -> RedemptionResult<Vec<UserQrScan>> {
        let rows = sqlx::query_as::<_, ScanRow>(
            "SELECT account_id, qr_code_id, count FROM user_qr_scans WHERE account_id = $1",
        )
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ScanRow::into_scan).collect())
    }

    async fn delete_all_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<u64> {
        let result = sqlx::query("DELETE FROM user_qr_scans WHERE qr_code_id = $1")
            .bind(code_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> RedemptionResult<u64> {
        let result = sqlx::query("DELETE FROM user_qr_scans WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ActionRow {
    qr_action_id: Uuid,
    payload: String,
    created_at: DateTime<Utc>,
}

impl ActionRow {
    fn into_action(self) -> QrAction {
        QrAction {
            id: QrActionId::from_uuid(self.qr_action_id),
            payload: ActionPayload::from_db(self.payload),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CodeRow {
    qr_code_id: Uuid,
    qr_action_id: Uuid,
    usage_policy: String,
    max_usages: i64,
    redemptions: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl CodeRow {
    fn into_code(self) -> RedemptionResult<QrCode> {
        Ok(QrCode {
            id: QrCodeId::from_uuid(self.qr_code_id),
            action_id: QrActionId::from_uuid(self.qr_action_id),
            policy: self.usage_policy.parse::<UsagePolicy>()?,
            max_usages: self.max_usages,
            redemptions: self.redemptions,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScanRow {
    account_id: Uuid,
    qr_code_id: Uuid,
    count: i64,
}

impl ScanRow {
    fn into_scan(self) -> UserQrScan {
        UserQrScan {
            account_id: AccountId::from_uuid(self.account_id),
            code_id: QrCodeId::from_uuid(self.qr_code_id),
            count: self.count,
        }
    }
}
