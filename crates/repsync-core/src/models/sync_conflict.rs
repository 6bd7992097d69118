//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::EntityKind;

/// A stale write rejected by last-write-wins, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Kind of the record involved
    pub kind: EntityKind,
    /// Record involved in the conflict
    pub client_id: String,
    /// Existing row's clock when the conflict occurred
    pub local_updated_at: i64,
    /// Incoming row's clock that was rejected
    pub incoming_updated_at: i64,
    /// Device that authored the rejected write, when known
    pub incoming_device_id: Option<String>,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
