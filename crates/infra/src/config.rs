//! Configuration loading and representation.
//!
//! All settings come from environment variables:
//!
//! | variable | default |
//! |---|---|
//! | `CATALOGQL_BIND` | `0.0.0.0:4000` |
//! | `DATABASE_URL` | unset (in-memory store) |
//! | `CATALOGQL_DB_MAX_CONNECTIONS` | `10` |
//! | `CATALOGQL_STATEMENT_TIMEOUT_MS` | `5000` |
//! | `CATALOGQL_AUTO_MIGRATE` | `true` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub statement_timeout: Duration,
    pub auto_migrate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            database_url: None,
            max_connections: 10,
            statement_timeout: Duration::from_millis(5000),
            auto_migrate: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = parse_or(&lookup, "CATALOGQL_BIND", defaults.bind_addr)?;
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        let max_connections = parse_or(&lookup, "CATALOGQL_DB_MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "CATALOGQL_DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout_ms: u64 = parse_or(
            &lookup,
            "CATALOGQL_STATEMENT_TIMEOUT_MS",
            defaults.statement_timeout.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "CATALOGQL_STATEMENT_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let auto_migrate = match lookup("CATALOGQL_AUTO_MIGRATE") {
            None => defaults.auto_migrate,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "CATALOGQL_AUTO_MIGRATE",
                value: raw.clone(),
                reason: "expected true/false/1/0".to_string(),
            })?,
        };

        Ok(Self {
            bind_addr,
            database_url,
            max_connections,
            statement_timeout: Duration::from_millis(timeout_ms),
            auto_migrate,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
