//! In-Memory Repository Implementations
//!
//! Same conditional-write semantics as the PostgreSQL store. Each
//! operation yields to the scheduler before touching state so that
//! concurrent callers interleave the way they would against a database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, DeviceId};
use parking_lot::Mutex;
use platform::password::HashedSecret;

use crate::domain::entity::{account::Account, permanent_session::PermanentSession};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    sessions: HashMap<(AccountId, DeviceId), PermanentSession>,
}

/// In-memory auth repository
#[derive(Clone, Default)]
pub struct MemoryAuthRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the admin flag on an existing account
    pub fn set_admin(&self, account_id: &AccountId, is_admin: bool) -> bool {
        let mut state = self.state.lock();
        match state.accounts.get_mut(account_id) {
            Some(account) => {
                account.is_admin = is_admin;
                true
            }
            None => false,
        }
    }

    pub fn session_count(&self, account_id: &AccountId) -> usize {
        let state = self.state.lock();
        state
            .sessions
            .keys()
            .filter(|(owner, _)| owner == account_id)
            .count()
    }
}

impl AccountRepository for MemoryAuthRepository {
    async fn insert_if_absent(&self, account: &Account) -> AuthResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();

        if state.accounts.values().any(|a| a.email == account.email) {
            return Ok(false);
        }
        state.accounts.insert(account.account_id, account.clone());
        Ok(true)
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_by_id(&self, account_id: &AccountId) -> AuthResult<Option<Account>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state.accounts.get(account_id).cloned())
    }

    async fn update_password_hash(
        &self,
        account_id: &AccountId,
        password_hash: &HashedSecret,
    ) -> AuthResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.accounts.get_mut(account_id) {
            Some(account) => {
                account.password_hash = password_hash.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, account_id: &AccountId) -> AuthResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        Ok(state.accounts.remove(account_id).is_some())
    }
}

impl SessionRepository for MemoryAuthRepository {
    async fn upsert(&self, session: &PermanentSession) -> AuthResult<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state
            .sessions
            .insert((session.account_id, session.device_id), session.clone());
        Ok(())
    }

    async fn find(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
    ) -> AuthResult<Option<PermanentSession>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state.sessions.get(&(*account_id, *device_id)).cloned())
    }

    async fn update_token_hash_and_last_used(
        &self,
        account_id: &AccountId,
        device_id: &DeviceId,
        expected_hash: &HashedSecret,
        new_hash: &HashedSecret,
        last_used_at: DateTime<Utc>,
    ) -> AuthResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.sessions.get_mut(&(*account_id, *device_id)) {
            Some(session) if &session.token_hash == expected_hash => {
                session.token_hash = new_hash.clone();
                session.last_used_at = last_used_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, account_id: &AccountId, device_id: &DeviceId) -> AuthResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        Ok(state.sessions.remove(&(*account_id, *device_id)).is_some())
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> AuthResult<u64> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let before = state.sessions.len();
        state.sessions.retain(|(owner, _), _| owner != account_id);
        Ok((before - state.sessions.len()) as u64)
    }
}
