//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::Duration;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub db_max_connections: u32,
    pub session_ttl_days: i64,
    pub cors_origin: String,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
}

/// Reads `key`, falling back to `default` when unset, and parses it.
fn parse_var<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("'{raw}': {e}")))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let db_max_connections = parse_var::<u32>("DB_MAX_CONNECTIONS", "5")?;
        let session_ttl_days = parse_var::<i64>("SESSION_TTL_DAYS", "30")?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be at least one day".to_string(),
            ));
        }
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let cookie_secure = parse_var::<bool>("COOKIE_SECURE", "true")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            db_max_connections,
            session_ttl_days,
            cors_origin,
            cookie_secure,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::days(self.session_ttl_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_values_name_the_variable() {
        std::env::set_var("CONFIG_TEST_PORT_COUNT", "many");
        let err = parse_var::<u32>("CONFIG_TEST_PORT_COUNT", "5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue(key, _) if key == "CONFIG_TEST_PORT_COUNT"
        ));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let ttl = parse_var::<i64>("CONFIG_TEST_UNSET_TTL", "30").unwrap();
        assert_eq!(ttl, 30);
        let secure = parse_var::<bool>("CONFIG_TEST_UNSET_SECURE", "true").unwrap();
        assert!(secure);
    }
}
