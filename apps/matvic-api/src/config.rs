//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use matvic_db::pool::IN_MEMORY_PATH;
use matvic_db::DbConfig;
use tracing::warn;

/// Secret used when `MATVIC_JWT_SECRET` is unset. Only acceptable in development.
pub const DEV_JWT_SECRET: &str = "matvic-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Interface to bind, e.g. `0.0.0.0`
    pub bind_addr: String,

    /// SQLite file path, or `:memory:`
    pub db_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 shared secret for bearer tokens
    pub jwt_secret: String,

    /// Lifetime of tokens minted by `dev-token`, in seconds
    pub jwt_lifetime_secs: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("MATVIC_JWT_SECRET") {
            Some(secret) if secret.trim().is_empty() => {
                return Err(ConfigError::MissingRequired("MATVIC_JWT_SECRET".to_string()))
            }
            Some(secret) => secret,
            None => {
                warn!("MATVIC_JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let config = ApiConfig {
            http_port: parse_or(&lookup, "MATVIC_HTTP_PORT", 3001)?,

            bind_addr: lookup("MATVIC_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),

            db_path: lookup("MATVIC_DB_PATH").unwrap_or_else(|| "./matvic.db".to_string()),

            db_max_connections: parse_or(&lookup, "MATVIC_DB_MAX_CONNECTIONS", 5)?,

            jwt_secret,

            jwt_lifetime_secs: parse_or(&lookup, "MATVIC_JWT_LIFETIME_SECS", 8 * 3600)?, // one shift
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "MATVIC_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MATVIC_BIND_ADDR".to_string()))
    }

    /// Pool settings for [`matvic_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.db_path == IN_MEMORY_PATH {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.db_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_secs(5))
    }

    /// Whether the server is running on the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 3001);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.db_path, "./matvic.db");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.uses_dev_secret());
        assert_eq!(config.socket_addr().unwrap().port(), 3001);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MATVIC_HTTP_PORT", "8080"),
            ("MATVIC_BIND_ADDR", "127.0.0.1"),
            ("MATVIC_DB_PATH", ":memory:"),
            ("MATVIC_JWT_SECRET", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.db_config().is_in_memory());
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("MATVIC_HTTP_PORT", "http")]),
            Err(ConfigError::InvalidValue(key)) if key == "MATVIC_HTTP_PORT"
        ));
        assert!(matches!(
            load(&[("MATVIC_DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("MATVIC_JWT_SECRET", "  ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
