//! Domain Entities
//!
//! Core business entities for the redemption domain.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, QrActionId, QrCodeId};

use crate::domain::value_objects::{ActionPayload, UsagePolicy};

/// Something a client does after redeeming a code
#[derive(Debug, Clone)]
pub struct QrAction {
    pub id: QrActionId,
    pub payload: ActionPayload,
    pub created_at: DateTime<Utc>,
}

impl QrAction {
    pub fn new(payload: ActionPayload) -> Self {
        Self {
            id: QrActionId::new(),
            payload,
            created_at: Utc::now(),
        }
    }
}

/// A scannable code granting limited access to one action
#[derive(Debug, Clone)]
pub struct QrCode {
    pub id: QrCodeId,
    pub action_id: QrActionId,
    pub policy: UsagePolicy,
    /// 0 means unlimited
    pub max_usages: i64,
    /// Successful redemptions across all accounts
    pub redemptions: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl QrCode {
    pub fn new(
        action_id: QrActionId,
        policy: UsagePolicy,
        max_usages: i64,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QrCodeId::new(),
            action_id,
            policy,
            max_usages,
            redemptions: 0,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether redemptions must also claim a slot on the aggregate counter
    pub fn has_global_quota(&self) -> bool {
        self.policy == UsagePolicy::Global && self.max_usages > 0
    }
}

/// How often one account has redeemed one code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQrScan {
    pub account_id: AccountId,
    pub code_id: QrCodeId,
    pub count: i64,
}

impl UserQrScan {
    /// A fresh counter, created on the account's first attempt
    pub fn first(account_id: AccountId, code_id: QrCodeId) -> Self {
        Self {
            account_id,
            code_id,
            count: 0,
        }
    }
}
