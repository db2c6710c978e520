//! Bearer Token Issuing and Parsing
//!
//! HMAC-signed JWTs carrying `{sub, iat, exp, typ, jti}`. The random
//! `jti` keeps two tokens issued in the same second distinct.
//!
//! [`TokenIssuer::parse`] checks signature, algorithm family and claim
//! structure only. Expiry and token type are returned as data; callers
//! decide what an expired or wrongly-typed token means for them.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed; no token was produced
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Bad signature, unsupported algorithm or malformed claims
    #[error("Invalid token")]
    InvalidToken,
}

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claim set carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expires at, unix seconds
    pub exp: i64,
    pub typ: TokenType,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    pub fn token_type(&self) -> TokenType {
        self.typ
    }

    /// `true` once `now` has reached `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Access/refresh token pair from a single issue call
#[derive(Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Signs and verifies tokens with one shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign one token of the given type
    pub fn issue(
        &self,
        subject: &str,
        typ: TokenType,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ,
            jti: Uuid::new_v4().to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Sign an access token and a refresh token for the same subject
    ///
    /// Either both tokens are returned or neither is.
    pub fn issue_pair(
        &self,
        subject: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access = self.issue(subject, TokenType::Access, access_ttl, now)?;
        let refresh = self.issue(subject, TokenType::Refresh, refresh_ttl, now)?;

        Ok(TokenPair {
            access,
            refresh,
            expires_in: access_ttl.num_seconds(),
        })
    }

    /// Verify signature and structure, returning the claims
    ///
    /// Expired tokens still parse.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidToken)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}
