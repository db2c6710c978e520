//! Domain Value Objects
//!
//! Immutable value types for the redemption domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RedemptionError;

/// Maximum serialized payload size in bytes
pub const PAYLOAD_MAX_BYTES: usize = 64 * 1024;

/// Serialized instructions a client executes after redeeming a code
///
/// Always a well-formed JSON document. Stored and served verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPayload(String);

impl ActionPayload {
    pub fn new(raw: impl Into<String>) -> Result<Self, RedemptionError> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(RedemptionError::InvalidPayload(
                "Payload cannot be empty".to_string(),
            ));
        }

        if raw.len() > PAYLOAD_MAX_BYTES {
            return Err(RedemptionError::InvalidPayload(format!(
                "Payload must be at most {} bytes",
                PAYLOAD_MAX_BYTES
            )));
        }

        serde_json::from_str::<serde::de::IgnoredAny>(&raw)
            .map_err(|e| RedemptionError::InvalidPayload(format!("Payload is not JSON: {e}")))?;

        Ok(Self(raw))
    }

    /// Create from database value (already validated at creation)
    pub fn from_db(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// How a code's usage limit is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsagePolicy {
    /// The limit applies to each account separately
    PerAccount,
    /// The limit is shared by all accounts; each account may redeem at most twice
    Global,
}

impl UsagePolicy {
    /// Whether one more redemption is allowed
    ///
    /// `max_usages == 0` means unlimited. `global_count` is the sum of all
    /// accounts' counts and is only consulted for `Global`.
    pub fn check(self, max_usages: i64, account_count: i64, global_count: i64) -> bool {
        if max_usages == 0 {
            return true;
        }
        match self {
            UsagePolicy::PerAccount => account_count < max_usages,
            UsagePolicy::Global => global_count < max_usages && account_count <= 1,
        }
    }

    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            UsagePolicy::PerAccount => "per_account",
            UsagePolicy::Global => "global",
        }
    }
}

impl fmt::Display for UsagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsagePolicy {
    type Err = RedemptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_account" => Ok(UsagePolicy::PerAccount),
            "global" => Ok(UsagePolicy::Global),
            other => Err(RedemptionError::Internal(format!(
                "Unknown usage policy in store: {other}"
            ))),
        }
    }
}

/// Outcome of a compare-and-set on a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The write went through; carries the new value
    Applied(i64),
    /// The stored value differed from the expected one, or the row is gone
    Conflict,
}
