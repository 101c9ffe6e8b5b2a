//! Signaling configuration loaded from environment variables.
//!
//! All settings have sensible defaults so an embedding app can start with
//! zero configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use callwire_shared::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_HISTORY_LIMIT, DEFAULT_RING_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// SQLite database file.
    /// Env: `CALLWIRE_DB_PATH`
    /// Default: `None` (platform data directory).
    pub db_path: Option<PathBuf>,

    /// Maximum number of calls whose connection is cached.
    /// Env: `CALLWIRE_CACHE_CAPACITY`
    pub cache_capacity: usize,

    /// Page size used when call history is requested without a limit.
    /// Env: `CALLWIRE_HISTORY_LIMIT`
    pub history_limit: u32,

    /// Ring timeout for callers that opt into one.
    /// Env: `CALLWIRE_RING_TIMEOUT_SECS`
    pub ring_timeout: Duration,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            history_limit: DEFAULT_HISTORY_LIMIT,
            ring_timeout: Duration::from_secs(DEFAULT_RING_TIMEOUT_SECS),
        }
    }
}

impl SignalConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CALLWIRE_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        config.cache_capacity = parse_var("CALLWIRE_CACHE_CAPACITY", config.cache_capacity);
        config.history_limit = parse_var("CALLWIRE_HISTORY_LIMIT", config.history_limit);
        config.ring_timeout = Duration::from_secs(parse_var(
            "CALLWIRE_RING_TIMEOUT_SECS",
            config.ring_timeout.as_secs(),
        ));

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

fn parse_var<T: FromStr + Copy>(key: &str, default: T) -> T {
    parse_value(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_value<T: FromStr + Copy>(key: &str, raw: Option<&str>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }
    }
}
