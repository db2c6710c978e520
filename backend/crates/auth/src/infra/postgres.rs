//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, DeviceId};
use platform::password::HashedSecret;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{account::Account, permanent_session::PermanentSession};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove sessions whose expiry has passed
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM permanent_sessions WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn insert_if_absent(&self, account: &Account) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                email,
                password_hash,
                is_admin,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.email.as_str())
        .bind(account.password_hash.as_str())
        .bind(account.is_admin)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT account_id, email, password_hash, is_admin, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT account_id, email, password_hash, is_admin, created_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &HashedSecret,
    ) -> AuthResult<bool> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .bind(password_hash.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, account_id: &AccountId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn upsert(&self, session: &PermanentSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permanent_sessions (
                account_id,
                device_id,
                token_hash,
                created_at,
                last_used_at,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (account_id, device_id) DO UPDATE SET
                token_hash = EXCLUDED.token_hash,
                created_at = EXCLUDED.created_at,
                last_used_at = EXCLUDED.last_used_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.account_id.as_uuid())
        .bind(session.device_id.as_uuid())
        .bind(session.token_hash.as_str())
        .bind(session.created_at)
        .bind(session.last_used_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
    ) -> AuthResult<Option<PermanentSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT account_id, device_id, token_hash, created_at, last_used_at, expires_at
            FROM permanent_sessions
            WHERE account_id = $1 AND device_id = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(device_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn update_token_hash_and_last_used(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        expected_hash: &HashedSecret,
        new_hash: &HashedSecret,
        last_used_at: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE permanent_sessions
            SET token_hash = $4, last_used_at = $5
            WHERE account_id = $1 AND device_id = $2 AND token_hash = $3
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(device_id.as_uuid())
        .bind(expected_hash.as_str())
        .bind(new_hash.as_str())
        .bind(last_used_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, account_id: &AccountId, device_id: &DeviceId) -> AuthResult<bool> {
        let result =
            sqlx::query("DELETE FROM permanent_sessions WHERE account_id = $1 AND device_id = $2")
                .bind(account_id.as_uuid())
                .bind(device_id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM permanent_sessions WHERE account_id = $1")
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
struct AccountRow {
    account_id: Uuid,
    email: String,
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> Account {
        Account {
            account_id: AccountId::from_uuid(self.account_id),
            email: Email::from_db(self.email),
            password_hash: HashedSecret::from_stored(self.password_hash),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    account_id: Uuid,
    device_id: Uuid,
    token_hash: String,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> PermanentSession {
        PermanentSession {
            account_id: AccountId::from_uuid(self.account_id),
            device_id: DeviceId::from_uuid(self.device_id),
            token_hash: HashedSecret::from_stored(self.token_hash),
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            expires_at: self.expires_at,
        }
    }
}
