//! Service Configuration
//!
//! Read once at startup from the process environment (after `.env`).
//! Library crates only ever see the typed configs built here.

use anyhow::{Context, bail};
use auth::AuthConfig;
use redemption::RedemptionConfig;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

/// Everything the binary needs to start
#[derive(Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub auth: AuthConfig,
    pub redemption: RedemptionConfig,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5u32)?;
        let bind_addr = parse_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let frontend_origins = env::var("FRONTEND_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let store_timeout = Duration::from_millis(parse_or("STORE_TIMEOUT_MS", 5000u64)?);

        let auth = AuthConfig {
            jwt_secret: secret("JWT_SECRET")?,
            pepper: secret("PEPPER_SECRET")?,
            access_token_ttl: scaled("ACCESS_TOKEN_TTL", 15, 60)?,
            refresh_token_ttl: scaled("REFRESH_TOKEN_TTL", 365, 24 * 3600)?,
            store_timeout,
            ..AuthConfig::default()
        };
        auth.validate()
            .map_err(|e| anyhow::anyhow!("invalid auth configuration: {e}"))?;

        let redemption = RedemptionConfig {
            max_list_count: parse_or("QR_MAX_LIST_COUNT", 1000usize)?,
            store_timeout,
            ..RedemptionConfig::default()
        };
        redemption
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid redemption configuration: {e}"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            frontend_origins,
            auth,
            redemption,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value")),
        Err(_) => Ok(default),
    }
}

/// A duration given in units of `unit_secs` seconds
fn scaled(key: &str, default: u64, unit_secs: u64) -> anyhow::Result<Duration> {
    parse_or(key, default)?
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .with_context(|| format!("{key} is too large"))
}

/// Required in release builds
///
/// Debug builds fall back to a random signing secret and an empty pepper.
fn secret(key: &str) -> anyhow::Result<Vec<u8>> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value.into_bytes()),
        _ if cfg!(debug_assertions) => {
            tracing::warn!(key, "Secret not set, using development default");
            Ok(match key {
                "JWT_SECRET" => AuthConfig::development().jwt_secret,
                _ => Vec::new(),
            })
        }
        _ => bail!("{key} must be set in production"),
    }
}
