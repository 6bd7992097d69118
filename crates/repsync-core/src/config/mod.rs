//! Client sync configuration.
//!
//! Provides `ClientSyncConfig`, shared by every client of the sync API, read
//! from a JSON file or from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_MIN_FOREGROUND_INTERVAL_SECS: u64 = 300;
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 4;

const ENV_API_BASE_URL: &str = "REPSYNC_API_BASE_URL";
const ENV_MIN_FOREGROUND_INTERVAL_SECS: &str = "REPSYNC_MIN_FOREGROUND_INTERVAL_SECS";
const ENV_FAILURE_THRESHOLD: &str = "REPSYNC_FAILURE_THRESHOLD";
const ENV_PROBE_TIMEOUT_SECS: &str = "REPSYNC_PROBE_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Invalid client config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client-side sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientSyncConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_min_foreground_interval_secs")]
    pub min_foreground_interval_secs: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ClientSyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            min_foreground_interval_secs: DEFAULT_MIN_FOREGROUND_INTERVAL_SECS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl ClientSyncConfig {
    /// Parse and validate a JSON config file payload.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(payload)?;
        config.validated()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            api_base_url: lookup(ENV_API_BASE_URL),
            ..Self::default()
        };

        if let Some(value) = parsed(&lookup, ENV_MIN_FOREGROUND_INTERVAL_SECS)? {
            config.min_foreground_interval_secs = value;
        }
        if let Some(value) = parsed(&lookup, ENV_FAILURE_THRESHOLD)? {
            config.failure_threshold = value;
        }
        if let Some(value) = parsed(&lookup, ENV_PROBE_TIMEOUT_SECS)? {
            config.probe_timeout_secs = value;
        }

        config.validated()
    }

    /// Normalize the base URL and check numeric bounds.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_base_url = match normalize_text_option(self.api_base_url.take()) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(invalid(
                    "api_base_url",
                    "must include http:// or https://",
                ))
            }
            None => None,
        };

        if self.failure_threshold == 0 {
            return Err(invalid("failure_threshold", "must be at least 1"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(invalid("probe_timeout_secs", "must be at least 1"));
        }

        Ok(self)
    }

    pub const fn min_foreground_interval(&self) -> Duration {
        Duration::from_secs(self.min_foreground_interval_secs)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_min_foreground_interval_secs() -> u64 {
    DEFAULT_MIN_FOREGROUND_INTERVAL_SECS
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = normalize_text_option(lookup(key)) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|_| invalid(key, &format!("'{raw}' is not a valid number")))
}
