//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.
//!
//! The backing store is only assumed to offer single-row conditional
//! writes, so every operation here touches one logical row or one
//! account's rows, never a multi-row transaction.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, DeviceId};
use platform::password::HashedSecret;

use crate::domain::entity::{account::Account, permanent_session::PermanentSession};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// Account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Insert unless the email is already registered
    ///
    /// Returns `false` when another account owns the email. Of several
    /// concurrent inserts for one email, exactly one returns `true`.
    async fn insert_if_absent(&self, account: &Account) -> AuthResult<bool>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>>;

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>>;

    /// Replace the password hash. Returns `false` if the account is gone.
    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &HashedSecret,
    ) -> AuthResult<bool>;

    /// Returns `false` if the account did not exist
    async fn delete(&self, account_id: &AccountId) -> AuthResult<bool>;
}

/// Permanent session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Insert or replace the session for its (account, device)
    async fn upsert(&self, session: &PermanentSession) -> AuthResult<()>;

    async fn find(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
    ) -> AuthResult<Option<PermanentSession>>;

    /// Swap the token hash if it still equals `expected_hash`
    ///
    /// Returns `false` when the row is gone or was rotated concurrently.
    async fn update_token_hash_and_last_used(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        expected_hash: &HashedSecret,
        new_hash: &HashedSecret,
        last_used_at: DateTime<Utc>,
    ) -> AuthResult<bool>;

    async fn delete(&self, account_id: &AccountId, device_id: &DeviceId) -> AuthResult<bool>;

    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64>;
}

/// Removes rows other bounded contexts own on behalf of an account
///
/// Account deletion calls this between revoking sessions and removing
/// the account row.
#[trait_variant::make(AccountDataPurge: Send)]
pub trait LocalAccountDataPurge {
    /// Returns the number of rows removed
    async fn purge_account_data(&self, account_id: &AccountId) -> AuthResult<u64>;
}

/// Purge for deployments where no other context stores account data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccountData;

impl AccountDataPurge for NoAccountData {
    async fn purge_account_data(&self, _account_id: &AccountId) -> AuthResult<u64> {
        Ok(0)
    }
}
