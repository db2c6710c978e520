//! Client identification utilities
//!
//! Header parsing for bearer credentials and client device identity.

use axum::http::{HeaderMap, header};
use uuid::Uuid;

/// Header carrying the client's device identifier
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Error when reading client identity headers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed header: {0}")]
    Malformed(&'static str),
}

/// Extract the token from `Authorization: Bearer <token>`
///
/// The scheme is matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, HeaderError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(HeaderError::MissingHeader("Authorization"))?
        .to_str()
        .map_err(|_| HeaderError::Malformed("Authorization"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(HeaderError::Malformed("Authorization"))?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(HeaderError::Malformed("Authorization"));
    }

    Ok(token)
}

/// Extract the device UUID from `X-Device-ID`
pub fn extract_device_id(headers: &HeaderMap) -> Result<Uuid, HeaderError> {
    let value = headers
        .get(DEVICE_ID_HEADER)
        .ok_or(HeaderError::MissingHeader("X-Device-ID"))?
        .to_str()
        .map_err(|_| HeaderError::Malformed("X-Device-ID"))?;

    Uuid::parse_str(value.trim()).map_err(|_| HeaderError::Malformed("X-Device-ID"))
}
