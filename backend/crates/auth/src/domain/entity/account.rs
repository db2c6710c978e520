//! Account Entity
//!
//! A registered identity. The email is unique across accounts and the
//! password hash is the only field that changes after creation.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::password::HashedSecret;

use crate::domain::value_object::email::Email;

/// Account entity
#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    pub email: Email,
    /// `base64(salt)$base64(key)` of password and pepper
    pub password_hash: HashedSecret,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new non-admin account
    pub fn new(email: Email, password_hash: HashedSecret) -> Self {
        Self {
            account_id: AccountId::new(),
            email,
            password_hash,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}
