//! Centralized configuration for the check-in service.
//!
//! All configuration is loaded from environment variables (a `.env` file is
//! honoured) and validated at startup. A missing signing secret is not a
//! configuration error: the service starts and answers 503 on token routes
//! until an operator provides one.

use crate::token::SigningKey;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default freshness window for check-in tokens (7 days).
pub const DEFAULT_TOKEN_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable could not be parsed
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// A duration that must be positive is zero
    #[error("Invalid {0}: must be greater than 0")]
    ZeroDuration(&'static str),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Per-request timeout
    pub request_timeout: Duration,

    // Token settings
    /// Shared HMAC secret, if provisioned
    pub signing_key: Option<SigningKey>,
    /// Maximum token age accepted by verification
    pub token_max_age: Duration,

    // Roster and ledger
    /// Event name stamped on imported roster entries
    pub event_name: String,
    /// Redis URL for the remote roster (and optionally the ledger)
    pub redis_url: Option<String>,
    /// Redis key holding the roster
    pub roster_key: String,
    /// Local roster cache file
    pub roster_cache_path: PathBuf,
    /// Persist the verification ledger in Redis
    pub ledger_persist: bool,
    /// Redis hash holding verification records
    pub ledger_key: String,

    // Scanning surface
    /// Minimum gap between any two admitted scans at one station
    pub scan_min_interval: Duration,
    /// Window in which a repeat of the same code at one station is dropped
    pub scan_repeat_window: Duration,

    // Admin
    /// Shared admin secret guarding roster and ledger mutations
    pub admin_secret: Option<SigningKey>,

    // Logging
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 3000)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT", 30)?),
            signing_key: secret_env("QR_SIGNING_SECRET"),
            token_max_age: Duration::from_secs(parse_env(
                "TOKEN_MAX_AGE_SECS",
                DEFAULT_TOKEN_MAX_AGE_SECS,
            )?),
            event_name: env::var("EVENT_NAME").unwrap_or_else(|_| "Glitch 1.0".to_string()),
            redis_url: non_empty_env("REDIS_URL"),
            roster_key: env::var("ROSTER_KEY").unwrap_or_else(|_| "members".to_string()),
            roster_cache_path: env::var("ROSTER_CACHE_PATH")
                .map_or_else(|_| PathBuf::from("data/members.json"), PathBuf::from),
            ledger_persist: parse_env("LEDGER_PERSIST", false)?,
            ledger_key: env::var("LEDGER_KEY").unwrap_or_else(|_| "verifications".to_string()),
            scan_min_interval: Duration::from_millis(parse_env("SCAN_MIN_INTERVAL_MS", 1200)?),
            scan_repeat_window: Duration::from_millis(parse_env("SCAN_REPEAT_WINDOW_MS", 2500)?),
            admin_secret: secret_env("ADMIN_SECRET"),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.token_max_age.is_zero() {
            return Err(ConfigError::ZeroDuration("TOKEN_MAX_AGE_SECS"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("REQUEST_TIMEOUT"));
        }
        if self.ledger_persist && self.redis_url.is_none() {
            return Err(ConfigError::MissingRequired(
                "REDIS_URL (required when LEDGER_PERSIST=true)".to_string(),
            ));
        }
        if self.roster_key.is_empty() || self.ledger_key.is_empty() {
            return Err(ConfigError::MissingRequired("ROSTER_KEY / LEDGER_KEY".to_string()));
        }
        Ok(())
    }

    /// Socket address string for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(30),
            signing_key: None,
            token_max_age: Duration::from_secs(DEFAULT_TOKEN_MAX_AGE_SECS),
            event_name: "Glitch 1.0".to_string(),
            redis_url: None,
            roster_key: "members".to_string(),
            roster_cache_path: PathBuf::from("data/members.json"),
            ledger_persist: false,
            ledger_key: "verifications".to_string(),
            scan_min_interval: Duration::from_millis(1200),
            scan_repeat_window: Duration::from_millis(2500),
            admin_secret: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Read a variable, treating blank as unset.
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read a secret; blank counts as not provisioned.
fn secret_env(name: &str) -> Option<SigningKey> {
    env::var(name).ok().and_then(|v| SigningKey::from_secret(v.as_bytes()))
}
