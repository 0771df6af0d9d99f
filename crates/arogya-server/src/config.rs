//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with
//! zero configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./arogya.db`
    pub database_path: PathBuf,

    /// HMAC secret for signing access tokens.
    /// Env: `JWT_SECRET`
    /// Default: a development-only value (a warning is logged).
    pub jwt_secret: String,

    /// Access token lifetime in days.
    /// Env: `TOKEN_TTL_DAYS`
    /// Default: `7`
    pub token_ttl_days: i64,

    /// Maximum request body size in bytes (10 MiB).
    pub max_body_bytes: usize,

    /// Sustained requests per second allowed per client IP.
    /// Env: `RATE_LIMIT_RPS`
    /// Default: `10`
    pub rate_limit_rps: f64,

    /// Burst size per client IP.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30`
    pub rate_limit_burst: f64,
}

/// Placeholder secret for local development only.
const DEV_JWT_SECRET: &str = "arogya-dev-secret-change-me";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 3000).into(),
            database_path: PathBuf::from("./arogya.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: 7,
            max_body_bytes: 10 * 1024 * 1024, // 10 MiB
            rate_limit_rps: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using development default (dev-only)");
            }
        }

        if let Ok(val) = std::env::var("TOKEN_TTL_DAYS") {
            match val.parse::<i64>() {
                Ok(days) if days > 0 => config.token_ttl_days = days,
                _ => tracing::warn!(value = %val, "Invalid TOKEN_TTL_DAYS, using default"),
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_RPS") {
            if let Ok(rps) = val.parse::<f64>() {
                config.rate_limit_rps = rps;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_BURST") {
            if let Ok(burst) = val.parse::<f64>() {
                config.rate_limit_burst = burst;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3000).into());
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }
}
