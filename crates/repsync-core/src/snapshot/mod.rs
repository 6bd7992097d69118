//! Versioned snapshot documents for full backup and restore.
//!
//! Version history:
//! - 1: training log, routines and personal records
//! - 2: adds supersets, training cycles and gamification

mod export;
mod import;

pub use export::export;
pub use import::{import, ImportReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::models::EntityBatch;

/// Snapshot version written by this build
pub const SNAPSHOT_VERSION: i64 = 2;

/// Oldest snapshot version this build restores
pub const MIN_SNAPSHOT_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub version: i64,
    /// Written as RFC 3339; epoch milliseconds are accepted on read
    #[serde(deserialize_with = "deserialize_exported_at")]
    pub exported_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_app_version")]
    pub app_version: String,
    #[serde(default)]
    pub data: EntityBatch,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExportedAt {
    Timestamp(DateTime<Utc>),
    Millis(i64),
}

fn deserialize_exported_at<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match ExportedAt::deserialize(deserializer)? {
        ExportedAt::Timestamp(at) => Ok(at),
        ExportedAt::Millis(millis) => DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            serde::de::Error::custom(format!("exportedAt {millis} is out of range"))
        }),
    }
}

fn deserialize_app_version<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl SnapshotDocument {
    /// Reject versions this build cannot restore.
    ///
    /// Newer versions are accepted; kinds this build does not know are
    /// ignored on parse.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.version < MIN_SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshot(format!(
                "version {} is older than {MIN_SNAPSHOT_VERSION}",
                self.version
            )));
        }
        if self.version > SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version {} is newer than {SNAPSHOT_VERSION}; unknown data will be ignored",
                self.version
            );
        }
        Ok(())
    }

    /// Render the document as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document, ignoring unknown kinds and fields.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Deterministic file name for this document.
    pub fn suggested_file_name(&self) -> String {
        format!(
            "repsync-snapshot-{}.json",
            self.exported_at.timestamp_millis()
        )
    }
}
