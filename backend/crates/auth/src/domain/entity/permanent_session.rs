//! Permanent Session Entity
//!
//! A long-lived login bound to one (account, device) pair.
//! Stores only a salted hash of the current refresh token.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{AccountId, DeviceId};
use platform::password::HashedSecret;

/// Permanent session entity
///
/// At most one row exists per (account, device). A later login from the
/// same device replaces it.
#[derive(Debug, Clone)]
pub struct PermanentSession {
    pub account_id: AccountId,
    pub device_id: DeviceId,
    /// Hash of the current refresh token
    pub token_hash: HashedSecret,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PermanentSession {
    /// Create a new session expiring `ttl` after `now`
    pub fn new(
        account_id: AccountId,
        device_id: DeviceId,
        token_hash: HashedSecret,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            device_id,
            token_hash,
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
        }
    }

    /// Expired once `now` reaches `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
