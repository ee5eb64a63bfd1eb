//! Ledger configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable               | Default    |
//! |------------------------|------------|
//! | `TPV_DB_PATH`          | `./tpv.db` |
//! | `TPV_MAX_CONNECTIONS`  | `5`        |
//! | `TPV_CONFLICT_RETRIES` | `3`        |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::pool::{DbConfig, DEFAULT_CONFLICT_RETRIES};

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// Attempts per ledger write before giving up on conflicts
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./tpv.db"),
            max_connections: 5,
            max_conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("TPV_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "TPV_MAX_CONNECTIONS", defaults.max_connections)?,

            max_conflict_retries: parse_or(
                &lookup,
                "TPV_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
            )?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TPV_MAX_CONNECTIONS".to_string()));
        }
        if config.max_conflict_retries == 0 {
            return Err(ConfigError::InvalidValue("TPV_CONFLICT_RETRIES".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .conflict_retries(self.max_conflict_retries)
    }
}

fn parse_or<F>(lookup: &F, name: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
