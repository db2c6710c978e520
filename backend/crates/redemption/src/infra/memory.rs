//! In-Memory Repository Implementations
//!
//! Same conditional-write semantics as the PostgreSQL store. Each
//! operation yields to the scheduler before touching state so that
//! concurrent redemptions interleave between read and compare-and-set.

use std::collections::HashMap;
use std::sync::Arc;

use kernel::id::{AccountId, QrActionId, QrCodeId};
use parking_lot::Mutex;

use crate::domain::entities::{QrAction, QrCode, UserQrScan};
use crate::domain::repository::{QrActionRepository, QrCodeRepository, UserQrScanRepository};
use crate::domain::value_objects::CounterUpdate;
use crate::error::RedemptionResult;

#[derive(Default)]
struct State {
    actions: HashMap<QrActionId, QrAction>,
    codes: HashMap<QrCodeId, QrCode>,
    scans: HashMap<(AccountId, QrCodeId), i64>,
}

/// In-memory redemption repository
#[derive(Clone, Default)]
pub struct MemoryRedemptionRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRedemptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scan rows for a code
    pub fn scan_rows_for_code(&self, code_id: &QrCodeId) -> usize {
        let state = self.state.lock();
        state.scans.keys().filter(|(_, code)| code == code_id).count()
    }
}

impl QrActionRepository for MemoryRedemptionRepository {
    async fn insert_if_absent(&self, action: &QrAction) -> RedemptionResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.actions.contains_key(&action.id) {
            return Ok(false);
        }
        state.actions.insert(action.id, action.clone());
        Ok(true)
    }

    async fn find_by_id(&self, action_id: &QrActionId) -> RedemptionResult<Option<QrAction>> {
        tokio::task::yield_now().await;
        Ok(self.state.lock().actions.get(action_id).cloned())
    }

    async fn delete(&self, action_id: &QrActionId) -> RedemptionResult<bool> {
        tokio::task::yield_now().await;
        Ok(self.state.lock().actions.remove(action_id).is_some())
    }

    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrAction>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        let mut actions: Vec<QrAction> = state.actions.values().cloned().collect();
        actions.sort_by_key(|a| a.created_at);
        actions.truncate(limit);
        Ok(actions)
    }
}

impl QrCodeRepository for MemoryRedemptionRepository {
    async fn insert_if_absent(&self, code: &QrCode) -> RedemptionResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.codes.contains_key(&code.id) {
            return Ok(false);
        }
        state.codes.insert(code.id, code.clone());
        Ok(true)
    }

    async fn find_by_id(&self, code_id: &QrCodeId) -> RedemptionResult<Option<QrCode>> {
        tokio::task::yield_now().await;
        Ok(self.state.lock().codes.get(code_id).cloned())
    }

    async fn delete(&self, code_id: &QrCodeId) -> RedemptionResult<bool> {
        tokio::task::yield_now().await;
        Ok(self.state.lock().codes.remove(code_id).is_some())
    }

    async fn list_up_to(&self, limit: usize) -> RedemptionResult<Vec<QrCode>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        let mut codes: Vec<QrCode> = state.codes.values().cloned().collect();
        codes.sort_by_key(|c| c.created_at);
        codes.truncate(limit);
        Ok(codes)
    }

    async fn atomic_increment_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.codes.get_mut(code_id) {
            Some(code) if code.redemptions == expected_prior => {
                code.redemptions += 1;
                Ok(CounterUpdate::Applied(code.redemptions))
            }
            _ => Ok(CounterUpdate::Conflict),
        }
    }

    async fn atomic_release_redemptions(
        &self,
        code_id: &QrCodeId,
        expected_prior: i64,
        amount: i64,
    ) -> RedemptionResult<CounterUpdate> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.codes.get_mut(code_id) {
            Some(code) if code.redemptions == expected_prior => {
                code.redemptions = (code.redemptions - amount).max(0);
                Ok(CounterUpdate::Applied(code.redemptions))
            }
            _ => Ok(CounterUpdate::Conflict),
        }
    }
}

impl UserQrScanRepository for MemoryRedemptionRepository {
    async fn insert_if_absent(&self, scan: &UserQrScan) -> RedemptionResult<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let key = (scan.account_id, scan.code_id);
        if state.scans.contains_key(&key) {
            return Ok(false);
        }
        state.scans.insert(key, scan.count);
        Ok(true)
    }

    async fn find(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
    ) -> RedemptionResult<Option<UserQrScan>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state
            .scans
            .get(&(*account_id, *code_id))
            .map(|&count| UserQrScan {
                account_id: *account_id,
                code_id: *code_id,
                count,
            }))
    }

    async fn sum_counts_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<i64> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state
            .scans
            .iter()
            .filter(|((_, code), _)| code == code_id)
            .map(|(_, count)| count)
            .sum())
    }

    async fn atomic_increment(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.scans.get_mut(&(*account_id, *code_id)) {
            Some(count) if *count == expected_prior => {
                *count += 1;
                Ok(CounterUpdate::Applied(*count))
            }
            _ => Ok(CounterUpdate::Conflict),
        }
    }

    async fn atomic_decrement(
        &self,
        account_id: &AccountId,
        code_id: &QrCodeId,
        expected_prior: i64,
    ) -> RedemptionResult<CounterUpdate> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        match state.scans.get_mut(&(*account_id, *code_id)) {
            Some(count) if *count == expected_prior && *count > 0 => {
                *count -= 1;
                Ok(CounterUpdate::Applied(*count))
            }
            _ => Ok(CounterUpdate::Conflict),
        }
    }

    async fn list_for_account(&self, account_id: &AccountId) -> RedemptionResult<Vec<UserQrScan>> {
        tokio::task::yield_now().await;
        let state = self.state.lock();
        Ok(state
            .scans
            .iter()
            .filter(|((owner, _), _)| owner == account_id)
            .map(|(&(account_id, code_id), &count)| UserQrScan {
                account_id,
                code_id,
                count,
            })
            .collect())
    }

    async fn delete_all_for_code(&self, code_id: &QrCodeId) -> RedemptionResult<u64> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let before = state.scans.len();
        state.scans.retain(|(_, code), _| code != code_id);
        Ok((before - state.scans.len()) as u64)
    }

    async fn delete_all_for_account(&self, account_id: &AccountId) -> RedemptionResult<u64> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        let before = state.scans.len();
        state.scans.retain(|(owner, _), _| owner != account_id);
        Ok((before - state.scans.len()) as u64)
    }
}
