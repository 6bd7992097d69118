use std::io;

use repsync_core::config::ConfigError;
use repsync_core::sync::SyncTransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] repsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] SyncTransportError),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error("Sync is not configured. Set REPSYNC_API_BASE_URL and REPSYNC_ACCESS_TOKEN to enable `repsync sync`.")]
    SyncNotConfigured,
}
