//! Server-side sync service shared by the API handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::db::{Database, StoreRole};
use crate::error::{Error, Result};

/// Default cap on records in one push
pub const DEFAULT_MAX_PUSH_RECORDS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncServiceOptions {
    /// Pushes with more records than this are rejected whole
    pub max_push_records: usize,
    /// Tombstones older than this are left out of pull responses
    pub tombstone_retention: Option<Duration>,
}

impl Default for SyncServiceOptions {
    fn default() -> Self {
        Self {
            max_push_records: DEFAULT_MAX_PUSH_RECORDS,
            tombstone_retention: None,
        }
    }
}

/// Thread-safe push/pull/status over the server store.
///
/// One connection behind one lock: a push holds it for its whole
/// transaction, so a pull sees all of a push or none of it.
#[derive(Clone)]
pub struct SyncService {
    pub(super) db: Arc<Mutex<Database>>,
    pub(super) options: SyncServiceOptions,
    db_path: Option<PathBuf>,
}

impl SyncService {
    /// Open the server store at the given filesystem path.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        options: SyncServiceOptions,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open_server(&db_path).await?;
        tracing::info!("Opened server store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            options,
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory server store (primarily for tests).
    pub async fn open_in_memory(options: SyncServiceOptions) -> Result<Self> {
        let db = Database::open_server_in_memory().await?;
        Self::from_database(db, options)
    }

    pub fn from_database(db: Database, options: SyncServiceOptions) -> Result<Self> {
        if db.role() != StoreRole::Server {
            return Err(Error::InvalidInput(
                "sync service requires a server store".to_string(),
            ));
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            options,
            db_path: None,
        })
    }

    pub const fn options(&self) -> &SyncServiceOptions {
        &self.options
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check the store answers queries.
    pub async fn ping(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.schema_version().await.map(|_| ())
    }

    /// Tombstone cut-off for a pull answered at `now`.
    pub(super) fn tombstone_horizon(&self, now: i64) -> Option<i64> {
        self.options.tombstone_retention.map(|retention| {
            let retention = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
            now.saturating_sub(retention)
        })
    }
}

pub(super) fn require_device_id(device_id: &str) -> Result<()> {
    if device_id.trim().is_empty() {
        return Err(Error::InvalidInput("deviceId must not be empty".to_string()));
    }
    Ok(())
}
