//! Request Context
//!
//! Identity resolved by the session middleware for one authenticated
//! request. Handlers receive it as a typed request extension.

use kernel::id::{AccountId, DeviceId};

/// Caller identity for an authenticated request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub account_id: AccountId,
    pub device_id: DeviceId,
}

impl RequestContext {
    pub fn new(account_id: AccountId, device_id: DeviceId) -> Self {
        Self {
            account_id,
            device_id,
        }
    }
}
