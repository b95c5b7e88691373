//! Booking service configuration.

use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::calendar::{CutoffTime, DEFAULT_CUTOFF};

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// An environment variable held an unusable value.
    #[error("environment variable {key}: {message}")]
    Env {
        /// Variable name.
        key: &'static str,
        /// What was wrong with it.
        message: String,
    },
    /// Parsed configuration failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reservation store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// Process-local store for development and tests.
    InMemory,
    /// Postgres via `database_url`.
    Postgres,
}

impl FromStr for StoreBackendConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in_memory" | "memory" => Ok(Self::InMemory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend `{other}`")),
        }
    }
}

fn default_timezone() -> String {
    "America/Costa_Rica".into()
}

const fn default_cutoff() -> CutoffTime {
    DEFAULT_CUTOFF
}

const fn default_poll_secs() -> u64 {
    20
}

const fn default_grace_secs() -> u64 {
    120
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}

const fn default_store() -> StoreBackendConfig {
    StoreBackendConfig::InMemory
}

const fn default_max_connections() -> u32 {
    10
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

const fn default_audit_buffer() -> usize {
    1024
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// IANA name of the operating timezone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Cutoff used when the visual configuration has none.
    #[serde(default = "default_cutoff")]
    pub default_cutoff: CutoffTime,
    /// Seconds between rollover polls.
    #[serde(default = "default_poll_secs")]
    pub rollover_poll_secs: u64,
    /// Seconds after the cutoff during which a rollover is still announced.
    #[serde(default = "default_grace_secs")]
    pub rollover_grace_secs: u64,
    /// HTTP listen address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// HS256 secret for identity tokens.
    pub jwt_secret: String,
    /// Store backend.
    #[serde(default = "default_store")]
    pub store: StoreBackendConfig,
    /// Postgres connection string, required for the Postgres backend.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Pool size for Postgres.
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Tokio worker threads.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Events retained by the in-memory audit sink; `0` disables auditing.
    #[serde(default = "default_audit_buffer")]
    pub audit_buffer: usize,
}

impl BookingConfig {
    /// Defaults around a signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            timezone: default_timezone(),
            default_cutoff: default_cutoff(),
            rollover_poll_secs: default_poll_secs(),
            rollover_grace_secs: default_grace_secs(),
            bind_addr: default_bind_addr(),
            jwt_secret: jwt_secret.into(),
            store: default_store(),
            database_url: None,
            database_max_connections: default_max_connections(),
            worker_threads: default_worker_threads(),
            audit_buffer: default_audit_buffer(),
        }
    }

    /// Parsed operating timezone.
    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown timezone `{}`", self.timezone))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.tz()?;
        if self.jwt_secret.trim().is_empty() {
            return Err("jwt_secret must not be empty".into());
        }
        if self.rollover_poll_secs == 0 {
            return Err("rollover_poll_secs must be greater than 0".into());
        }
        if self.rollover_grace_secs < self.rollover_poll_secs {
            return Err("rollover_grace_secs must be at least rollover_poll_secs".into());
        }
        if self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".into());
        }
        if self.store == StoreBackendConfig::Postgres {
            if self.database_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                return Err("database_url is required for the postgres store".into());
            }
            if self.database_max_connections == 0 {
                return Err("database_max_connections must be greater than 0".into());
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate().map_err(ConfigError::Invalid)?;
        Ok(cfg)
    }

    /// Build from the process environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::Env {
            key: "JWT_SECRET",
            message: "not set".into(),
        })?;
        let mut cfg = Self::with_secret(secret);

        if let Some(v) = lookup("BOOKING_TIMEZONE") {
            cfg.timezone = v;
        }
        if let Some(v) = lookup("BOOKING_DEFAULT_CUTOFF") {
            cfg.default_cutoff = CutoffTime::parse(&v).ok_or(ConfigError::Env {
                key: "BOOKING_DEFAULT_CUTOFF",
                message: format!("`{v}` is not HH:MM"),
            })?;
        }
        if let Some(v) = lookup("BOOKING_ROLLOVER_POLL_SECS") {
            cfg.rollover_poll_secs = parse_env("BOOKING_ROLLOVER_POLL_SECS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_ROLLOVER_GRACE_SECS") {
            cfg.rollover_grace_secs = parse_env("BOOKING_ROLLOVER_GRACE_SECS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = lookup("BOOKING_STORE") {
            cfg.store = parse_env("BOOKING_STORE", &v)?;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            cfg.database_url = Some(v);
        }
        if let Some(v) = lookup("BOOKING_DATABASE_MAX_CONNECTIONS") {
            cfg.database_max_connections = parse_env("BOOKING_DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_WORKER_THREADS") {
            cfg.worker_threads = parse_env("BOOKING_WORKER_THREADS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_AUDIT_BUFFER") {
            cfg.audit_buffer = parse_env("BOOKING_AUDIT_BUFFER", &v)?;
        }

        cfg.validate().map_err(ConfigError::Invalid)?;
        Ok(cfg)
    }
}

fn parse_env<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_defaults_fill_missing_keys() {
        let cfg = BookingConfig::from_json_str(r#"{"jwt_secret":"s3cret"}"#).unwrap();
        assert_eq!(cfg.timezone, "America/Costa_Rica");
        assert_eq!(cfg.default_cutoff, DEFAULT_CUTOFF);
        assert_eq!(cfg.rollover_poll_secs, 20);
        assert_eq!(cfg.store, StoreBackendConfig::InMemory);
        assert_eq!(cfg.tz().unwrap(), chrono_tz::America::Costa_Rica);
    }

    #[test]
    fn json_rejects_bad_values() {
        assert!(matches!(
            BookingConfig::from_json_str(r#"{"jwt_secret":"s","timezone":"Mars/Olympus"}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BookingConfig::from_json_str(r#"{"jwt_secret":"s","default_cutoff":"9pm"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BookingConfig::from_json_str(r#"{"jwt_secret":"s","store":"postgres"}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("JWT_SECRET", "k"),
            ("BOOKING_DEFAULT_CUTOFF", "20:30"),
            ("BOOKING_STORE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/gym"),
            ("BOOKING_ROLLOVER_POLL_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let cfg = BookingConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(cfg.default_cutoff.to_string(), "20:30");
        assert_eq!(cfg.store, StoreBackendConfig::Postgres);
        assert_eq!(cfg.rollover_poll_secs, 5);
    }

    #[test]
    fn lookup_requires_secret_and_well_formed_numbers() {
        assert!(matches!(
            BookingConfig::from_lookup(|_| None),
            Err(ConfigError::Env { key: "JWT_SECRET", .. })
        ));
        let err = BookingConfig::from_lookup(|k| match k {
            "JWT_SECRET" => Some("k".into()),
            "BOOKING_WORKER_THREADS" => Some("many".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "BOOKING_WORKER_THREADS", .. }));
    }
}
