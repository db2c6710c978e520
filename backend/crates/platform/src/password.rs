//! Secret Hashing and Verification
//!
//! Salted, peppered Argon2id hashing shared by account passwords and
//! session refresh tokens:
//! - [`CredentialStore`] derives and verifies `base64(salt)$base64(key)` strings
//! - [`ClearTextPassword`] enforces the registration password policy
//! - Sensitive buffers are zeroized after use
//!
//! ## Stored Format
//! The stored string carries only the salt and the derived key. Cost
//! parameters are not recorded, so every verifier must use the same
//! [`HashParams`] that produced the hash.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{constant_time_eq, from_base64, random_bytes, to_base64};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length in code points
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in code points
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Separator between the encoded salt and the encoded key
const FIELD_SEPARATOR: char = '$';

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    /// Upper case, lower case and digit are all required
    #[error("Password must contain an uppercase letter, a lowercase letter and a digit")]
    MissingCharacterClass,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Hashing errors
///
/// Verification never fails with an error; a malformed stored value
/// simply does not verify.
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Cost parameters rejected by Argon2
    #[error("Invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Key derivation failed
    #[error("Secret hashing failed: {0}")]
    HashingFailed(String),
}

// ============================================================================
// Hash Parameters
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Number of passes (t)
    pub time_cost: u32,
    /// Memory in KiB (m)
    pub memory_kib: u32,
    /// Lanes (p)
    pub parallelism: u32,
    /// Derived key length in bytes
    pub output_len: usize,
}

impl HashParams {
    /// t=1, m=64 MiB, p=4, 32-byte key
    pub const DEFAULT: Self = Self::new(1, 64 * 1024, 4, 32);

    pub const fn new(time_cost: u32, memory_kib: u32, parallelism: u32, output_len: usize) -> Self {
        Self {
            time_cost,
            memory_kib,
            parallelism,
            output_len,
        }
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Credential Store
// ============================================================================

/// Derives and verifies salted, peppered secret hashes
///
/// ## Examples
/// ```rust
/// use platform::password::{CredentialStore, HashParams};
///
/// let store = CredentialStore::new(HashParams::new(1, 64, 1, 32)).unwrap();
/// let hashed = store.hash(b"BIGsmal123#", b"pepper").unwrap();
/// assert!(store.verify(b"BIGsmal123#", b"pepper", hashed.as_str()));
/// ```
#[derive(Clone)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
    params: HashParams,
}

impl CredentialStore {
    /// Build a store, rejecting parameters Argon2 would not accept
    pub fn new(params: HashParams) -> Result<Self, PasswordHashError> {
        let argon_params = Params::new(
            params.memory_kib,
            params.time_cost,
            params.parallelism,
            Some(params.output_len),
        )
        .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
            params,
        })
    }

    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Hash `secret || pepper` under a fresh random salt
    pub fn hash(&self, secret: &[u8], pepper: &[u8]) -> Result<HashedSecret, PasswordHashError> {
        let salt = random_bytes(SALT_LEN);
        let key = self.derive(secret, pepper, &salt)?;

        Ok(HashedSecret(format!(
            "{}{}{}",
            to_base64(&salt),
            FIELD_SEPARATOR,
            to_base64(&key)
        )))
    }

    /// Check `secret || pepper` against a stored hash string
    ///
    /// Malformed stored values return `false`.
    pub fn verify(&self, secret: &[u8], pepper: &[u8], stored: &str) -> bool {
        let mut parts = stored.split(FIELD_SEPARATOR);
        let (Some(salt_b64), Some(key_b64), None) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        let (Ok(salt), Ok(expected)) = (from_base64(salt_b64), from_base64(key_b64)) else {
            return false;
        };

        match self.derive(secret, pepper, &salt) {
            Ok(actual) => constant_time_eq(&actual, &expected),
            Err(_) => false,
        }
    }

    fn derive(
        &self,
        secret: &[u8],
        pepper: &[u8],
        salt: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, PasswordHashError> {
        let mut input = Zeroizing::new(Vec::with_capacity(secret.len() + pepper.len()));
        input.extend_from_slice(secret);
        input.extend_from_slice(pepper);

        let mut key = Zeroizing::new(vec![0u8; self.params.output_len]);
        self.argon2
            .hash_password_into(&input, salt, &mut key)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(key)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("params", &self.params)
            .finish()
    }
}

// ============================================================================
// Hashed Secret (Safe to store)
// ============================================================================

/// Stored hash string in `base64(salt)$base64(key)` form
#[derive(Clone, PartialEq, Eq)]
pub struct HashedSecret(String);

impl HashedSecret {
    /// Wrap a value loaded from storage (not validated; see [`CredentialStore::verify`])
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HashedSecret").field(&"[HASH]").finish()
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// ## Examples
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("BIGsmal123#".to_string()).unwrap();
/// assert_eq!(password.as_bytes(), b"BIGsmal123#");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password with policy validation
    ///
    /// - 8 to 128 code points after NFKC normalization
    /// - Not empty/whitespace only
    /// - No control characters
    /// - At least one uppercase letter, one lowercase letter and one digit
    /// - Not a well-known weak password
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        let candidate = Self(normalized);

        if candidate.0.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = candidate.0.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        // Control characters other than tab/newline
        if candidate
            .0
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        let has_upper = candidate.0.chars().any(char::is_uppercase);
        let has_lower = candidate.0.chars().any(char::is_lowercase);
        let has_digit = candidate.0.chars().any(|c| c.is_ascii_digit());
        if !(has_upper && has_lower && has_digit) {
            return Err(PasswordPolicyError::MissingCharacterClass);
        }

        if is_common_pattern(&candidate.0) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(candidate)
    }

    /// Normalize a password without policy checks
    ///
    /// Used for login and password-change verification, where the stored
    /// hash decides and the policy at registration time may have differed.
    pub fn unchecked(raw: String) -> Self {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check for common weak patterns
fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password1",
        "password123",
        "passw0rd",
        "letmein1",
        "welcome1",
        "admin123",
        "iloveyou1",
        "trustno1",
    ];
    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// All digits form one ascending or descending run of 4+
fn is_sequential_numbers(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 4 || digits.len() != s.chars().count() {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));
    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}

// ============================================================================
// Tests
// ============================================================================
