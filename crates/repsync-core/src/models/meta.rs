//! Sync metadata carried by every entity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityKind;

/// Sync metadata shared by every syncable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    /// Merge key, assigned on the originating device
    pub client_id: String,
    /// Assigned once by the server on first ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Device that authored the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Logical clock (Unix ms)
    pub updated_at: i64,
    /// Tombstone (Unix ms)
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl SyncMeta {
    /// Metadata for a record freshly created on a device.
    pub fn new(client_id: impl Into<String>, updated_at: i64) -> Self {
        Self {
            client_id: client_id.into(),
            server_id: None,
            device_id: None,
            updated_at,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub const fn deleted(mut self, deleted_at: i64) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Metadata of a row already persisted in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMeta {
    pub server_id: Option<String>,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Reference from a child record to its parent, by client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub kind: EntityKind,
    pub client_id: String,
}

impl ParentRef {
    pub fn new(kind: EntityKind, client_id: &str) -> Self {
        Self {
            kind,
            client_id: client_id.to_string(),
        }
    }

    /// A parent reference for an optional foreign key.
    pub fn optional(kind: EntityKind, client_id: Option<&str>) -> Option<Self> {
        client_id.map(|client_id| Self::new(kind, client_id))
    }
}

/// Mint a fresh server identifier (UUID v7, time-sortable).
pub fn new_server_id() -> String {
    Uuid::now_v7().to_string()
}
