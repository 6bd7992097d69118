//! Sync state repository implementation

use crate::error::{Error, Result};
use crate::sync::SyncState;
use libsql::Connection;
use uuid::Uuid;

const LAST_SYNC_AT: &str = "last_sync_at";
const LAST_ATTEMPT_AT: &str = "last_attempt_at";
const CONSECUTIVE_FAILURES: &str = "consecutive_failures";
const PERSISTENT_ERROR: &str = "persistent_error";
const LAST_ERROR: &str = "last_error";
const DEVICE_ID: &str = "device_id";

/// Trait for sync bookkeeping storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SyncStateRepository {
    /// Load sync state from the database
    async fn load(&self) -> Result<SyncState>;

    /// Save sync state to the database
    async fn save(&self, state: &SyncState) -> Result<()>;

    /// This device's identifier, generated on first use
    async fn device_id(&self) -> Result<String>;
}

/// libSQL implementation of `SyncStateRepository`
pub struct LibSqlSyncStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncStateRepository for LibSqlSyncStateRepository<'_> {
    async fn load(&self) -> Result<SyncState> {
        let mut state = SyncState::default();

        if let Some(value) = self.get_value(LAST_SYNC_AT).await? {
            state.last_sync_at = value.parse().ok();
        }

        if let Some(value) = self.get_value(LAST_ATTEMPT_AT).await? {
            state.last_attempt_at = value.parse().ok();
        }

        if let Some(value) = self.get_value(CONSECUTIVE_FAILURES).await? {
            state.consecutive_failures = value.parse().unwrap_or_default();
        }

        if let Some(value) = self.get_value(PERSISTENT_ERROR).await? {
            state.persistent_error = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        state.last_error = self.get_value(LAST_ERROR).await?;

        Ok(state)
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        self.set_optional(LAST_SYNC_AT, state.last_sync_at.map(|v| v.to_string()))
            .await?;
        self.set_optional(
            LAST_ATTEMPT_AT,
            state.last_attempt_at.map(|v| v.to_string()),
        )
        .await?;
        self.set_value(
            CONSECUTIVE_FAILURES,
            &state.consecutive_failures.to_string(),
        )
        .await?;
        self.set_value(
            PERSISTENT_ERROR,
            if state.persistent_error {
                "true"
            } else {
                "false"
            },
        )
        .await?;
        self.set_optional(LAST_ERROR, state.last_error.clone())
            .await?;
        Ok(())
    }

    async fn device_id(&self) -> Result<String> {
        if let Some(device_id) = self.get_value(DEVICE_ID).await? {
            return Ok(device_id);
        }

        let device_id = Uuid::now_v7().to_string();
        self.set_value(DEVICE_ID, &device_id).await?;
        tracing::info!("Generated device id {device_id}");
        Ok(device_id)
    }
}

impl LibSqlSyncStateRepository<'_> {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput("sync state key must not be empty".into()));
        }
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn set_optional(&self, key: &str, value: Option<String>) -> Result<()> {
        match value {
            Some(value) => self.set_value(key, &value).await,
            None => {
                self.conn
                    .execute("DELETE FROM sync_state WHERE key = ?", [key])
                    .await?;
                Ok(())
            }
        }
    }
}
