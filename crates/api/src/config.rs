//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_VAR: &str = "RAVENPOST_BIND";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const SEED_VAR: &str = "RAVENPOST_SEED";
pub const DB_MAX_CONNECTIONS_VAR: &str = "RAVENPOST_DB_MAX_CONNECTIONS";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind: SocketAddr,
    /// SQLite URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Seed the catalog when it is empty.
    pub seed: bool,
    pub db_max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            seed: true,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = var(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid(BIND_VAR, &bind_raw, e.to_string()))?;

        let seed = match var(SEED_VAR) {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                invalid(SEED_VAR, &raw, "expected true/false".to_string())
            })?,
        };

        let db_max_connections = match var(DB_MAX_CONNECTIONS_VAR) {
            None => DEFAULT_DB_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(invalid(
                        DB_MAX_CONNECTIONS_VAR,
                        &raw,
                        "must be at least 1".to_string(),
                    ));
                }
                Err(e) => return Err(invalid(DB_MAX_CONNECTIONS_VAR, &raw, e.to_string())),
            },
        };

        Ok(Self {
            bind,
            database_url: var(DATABASE_URL_VAR),
            seed,
            db_max_connections,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}
