//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once at startup
//! and shared by `Arc` with every use case.

use std::fmt;
use std::time::Duration;

use platform::password::{CredentialStore, HashParams};
use platform::token::TokenIssuer;

use crate::error::{AuthError, AuthResult};

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Token signing secret (HMAC)
    pub jwt_secret: Vec<u8>,
    /// Pepper appended to every password and refresh token before hashing
    pub pepper: Vec<u8>,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token and permanent session lifetime (365 days)
    pub refresh_token_ttl: Duration,
    /// Deadline for each store operation
    pub store_timeout: Duration,
    /// Argon2id cost parameters
    pub hash_params: HashParams,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            pepper: Vec::new(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(365 * 24 * 3600),
            store_timeout: Duration::from_secs(5),
            hash_params: HashParams::DEFAULT,
        }
    }
}

impl AuthConfig {
    /// Create config with a random signing secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            jwt_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (random secret, empty pepper)
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    /// Reject configurations that cannot issue or verify anything
    pub fn validate(&self) -> AuthResult<()> {
        if self.jwt_secret.is_empty() {
            return Err(AuthError::Internal("JWT secret is empty".to_string()));
        }
        self.access_ttl()?;
        self.session_ttl()?;
        self.credential_store()?;
        Ok(())
    }

    pub fn pepper(&self) -> &[u8] {
        &self.pepper
    }

    pub fn access_ttl(&self) -> AuthResult<chrono::Duration> {
        bounded_ttl(self.access_token_ttl, "access token")
    }

    /// Refresh tokens and sessions share one lifetime
    pub fn session_ttl(&self) -> AuthResult<chrono::Duration> {
        bounded_ttl(self.refresh_token_ttl, "session")
    }

    pub fn credential_store(&self) -> AuthResult<CredentialStore> {
        CredentialStore::new(self.hash_params).map_err(AuthError::from)
    }

    pub fn token_issuer(&self) -> TokenIssuer {
        TokenIssuer::new(&self.jwt_secret)
    }
}

/// Upper bound on any lifetime, keeps `now + ttl` inside the date range
const MAX_TTL_DAYS: i64 = 100 * 365;

fn bounded_ttl(ttl: Duration, what: &str) -> AuthResult<chrono::Duration> {
    chrono::Duration::from_std(ttl)
        .ok()
        .filter(|ttl| *ttl <= chrono::Duration::days(MAX_TTL_DAYS))
        .ok_or_else(|| AuthError::Internal(format!("Invalid {what} TTL: {ttl:?}")))
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("pepper", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("hash_params", &self.hash_params)
            .finish()
    }
}
