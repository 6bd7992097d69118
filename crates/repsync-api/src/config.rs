use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use repsync_core::services::{SyncServiceOptions, DEFAULT_MAX_PUSH_RECORDS};
use thiserror::Error;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub rate_limit_window: Duration,
    pub push_rate_limit_per_window: u32,
    pub pull_rate_limit_per_window: u32,
    pub max_push_records: usize,
    pub tombstone_retention: Option<Duration>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The store path can reveal host layout; log only its file name.
        let database_file = self
            .database_path
            .file_name()
            .map_or_else(|| "[REDACTED]".to_string(), |name| name.to_string_lossy().into_owned());
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_file", &database_file)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("push_rate_limit_per_window", &self.push_rate_limit_per_window)
            .field("pull_rate_limit_per_window", &self.pull_rate_limit_per_window)
            .field("max_push_records", &self.max_push_records)
            .field("tombstone_retention", &self.tombstone_retention)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "REPSYNC_API_BIND_ADDR", "127.0.0.1:8080");
        let database_path = PathBuf::from(required_trimmed(&lookup, "REPSYNC_DATABASE_PATH")?);

        let rate_limit_window_secs =
            bounded_u64(&lookup, "RATE_LIMIT_WINDOW_SECS", "60", 10, 3_600)?;
        let push_rate_limit_per_window =
            bounded_u32(&lookup, "PUSH_RATE_LIMIT_PER_WINDOW", "30", 1, 1_000)?;
        let pull_rate_limit_per_window =
            bounded_u32(&lookup, "PULL_RATE_LIMIT_PER_WINDOW", "120", 1, 5_000)?;

        let default_max_push = DEFAULT_MAX_PUSH_RECORDS.to_string();
        let max_push_records = bounded_u64(&lookup, "MAX_PUSH_RECORDS", &default_max_push, 1, 100_000)?;
        let max_push_records = usize::try_from(max_push_records)
            .map_err(|_| ConfigError::Invalid("MAX_PUSH_RECORDS is too large".to_string()))?;

        let tombstone_retention = match optional_trimmed(&lookup, "TOMBSTONE_RETENTION_DAYS") {
            None => None,
            Some(raw) => {
                let days = raw.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(
                        "TOMBSTONE_RETENTION_DAYS must be an integer in [1, 3650]".to_string(),
                    )
                })?;
                if !(1..=3_650).contains(&days) {
                    return Err(ConfigError::Invalid(
                        "TOMBSTONE_RETENTION_DAYS must be in [1, 3650]".to_string(),
                    ));
                }
                Some(Duration::from_secs(days * SECS_PER_DAY))
            }
        };

        Ok(Self {
            bind_addr,
            database_path,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            push_rate_limit_per_window,
            pull_rate_limit_per_window,
            max_push_records,
            tombstone_retention,
        })
    }

    pub fn service_options(&self) -> SyncServiceOptions {
        SyncServiceOptions {
            max_push_records: self.max_push_records,
            tombstone_retention: self.tombstone_retention,
        }
    }
}

fn bounded_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]")))?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

fn bounded_u32(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: u32,
    max: u32,
) -> Result<u32, ConfigError> {
    let value = bounded_u64(lookup, name, default, u64::from(min), u64::from(max))?;
    u32::try_from(value).map_err(|_| ConfigError::Invalid(format!("{name} is out of range")))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
