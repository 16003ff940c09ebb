//! Portal API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                    | Default       |
//! |-----------------------------|---------------|
//! | `PORTAL_HTTP_HOST`          | `0.0.0.0`     |
//! | `PORTAL_HTTP_PORT`          | `8080`        |
//! | `PORTAL_DATABASE_PATH`      | `./portal.db` |
//! | `PORTAL_DB_MAX_CONNECTIONS` | `8`           |
//! | `PORTAL_LOG_LEVEL`          | `info`        |
//! | `PORTAL_SEED_TARIFFS`       | `true`        |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Portal API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Interface the HTTP server binds to
    pub http_host: String,

    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Load the standard tariff book on startup when none is stored
    pub seed_tariffs: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            database_path: PathBuf::from("./portal.db"),
            db_max_connections: 8,
            log_level: "info".to_string(),
            seed_tariffs: true,
        }
    }
}

impl PortalConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PortalConfig::default();

        let config = PortalConfig {
            http_host: lookup("PORTAL_HTTP_HOST").unwrap_or(defaults.http_host),

            http_port: parse_var(&lookup, "PORTAL_HTTP_PORT", defaults.http_port)?,

            database_path: lookup("PORTAL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: parse_var(
                &lookup,
                "PORTAL_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            log_level: lookup("PORTAL_LOG_LEVEL").unwrap_or(defaults.log_level),

            seed_tariffs: parse_var(&lookup, "PORTAL_SEED_TARIFFS", defaults.seed_tariffs)?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "PORTAL_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired(
                "PORTAL_DATABASE_PATH".to_string(),
            ));
        }

        Ok(config)
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
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

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = PortalConfig::from_lookup(lookup(&[
            ("PORTAL_HTTP_PORT", "9000"),
            ("PORTAL_DATABASE_PATH", "/var/lib/portal/portal.db"),
            ("PORTAL_DB_MAX_CONNECTIONS", "16"),
            ("PORTAL_LOG_LEVEL", "debug"),
            ("PORTAL_SEED_TARIFFS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/portal/portal.db"));
        assert_eq!(config.db_max_connections, 16);
        assert_eq!(config.log_level, "debug");
        assert!(!config.seed_tariffs);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = PortalConfig::from_lookup(lookup(&[("PORTAL_HTTP_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORTAL_HTTP_PORT");

        let err = PortalConfig::from_lookup(lookup(&[("PORTAL_SEED_TARIFFS", "yes")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "PORTAL_SEED_TARIFFS"));

        let err =
            PortalConfig::from_lookup(lookup(&[("PORTAL_DB_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
