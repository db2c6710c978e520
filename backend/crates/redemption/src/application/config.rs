//! Application Configuration
//!
//! Configuration for the redemption application layer.

use std::time::Duration;

use crate::error::{RedemptionError, RedemptionResult};

/// Redemption application configuration
#[derive(Debug, Clone)]
pub struct RedemptionConfig {
    /// Upper bound for management list requests
    pub max_list_count: usize,
    /// Compare-and-set attempts per counter before giving up
    pub max_commit_attempts: u32,
    /// Deadline for each store operation
    pub store_timeout: Duration,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            max_list_count: 1000,
            max_commit_attempts: 16,
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl RedemptionConfig {
    pub fn validate(&self) -> RedemptionResult<()> {
        if self.max_list_count == 0 {
            return Err(RedemptionError::Internal(
                "max_list_count must be positive".to_string(),
            ));
        }
        if self.max_commit_attempts == 0 {
            return Err(RedemptionError::Internal(
                "max_commit_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject list sizes outside `1..=max_list_count`
    pub fn check_list_count(&self, count: usize) -> RedemptionResult<usize> {
        if count == 0 || count > self.max_list_count {
            return Err(RedemptionError::InvalidInput(format!(
                "count must be between 1 and {}",
                self.max_list_count
            )));
        }
        Ok(count)
    }
}
