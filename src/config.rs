//! Service configuration
//!
//! Read from the environment after `.env` has been loaded.
//!
//! - `PORT`: listen port (default 8083)
//! - `DATABASE_URL`: Postgres URL; the in-memory store is used when unset
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
//! - `NATS_URL`: broker for domain events; events are logged when unset
//! - `EVENT_SUBJECT_PREFIX`: subject prefix for published events (default `storefront`)

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub event_subject_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let prefix = match lookup("EVENT_SUBJECT_PREFIX") {
            Some(v) if v.trim().is_empty() => return Err(ConfigError::Empty("EVENT_SUBJECT_PREFIX")),
            Some(v) => v.trim().to_string(),
            None => "storefront".to_string(),
        };
        Ok(Self {
            port: number(&lookup, "PORT", 8083)?,
            database_url: optional("DATABASE_URL"),
            database_max_connections: number(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: optional("NATS_URL"),
            event_subject_prefix: prefix,
        })
    }

    pub fn listen_addr(&self) -> String { format!("0.0.0.0:{}", self.port) }
}

fn number<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber { key, value }),
        None => Ok(default),
    }
}
