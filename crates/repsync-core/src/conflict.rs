//! Last-write-wins conflict resolution
//!
//! The single decision function used by push ingestion, snapshot import and
//! pulled-change application. Whole-record replacement: an accepted update
//! overwrites every field, tombstone included.

use crate::models::{StoredMeta, SyncMeta};

/// Outcome of comparing an incoming record with the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No stored row; the record is new to this store.
    Insert,
    /// Incoming clock is strictly newer; replace the stored row.
    Update { server_id: Option<String> },
    /// Incoming clock is not newer; keep the stored row.
    ///
    /// The stored server id is still reported so the caller can reconcile
    /// its local mapping.
    Reject { server_id: Option<String> },
}

impl Resolution {
    pub const fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }
}

/// Decide what to do with `incoming` given the `existing` row (if any).
pub fn resolve(existing: Option<&StoredMeta>, incoming: &SyncMeta) -> Resolution {
    match existing {
        None => Resolution::Insert,
        Some(stored) if incoming.updated_at > stored.updated_at => Resolution::Update {
            server_id: stored.server_id.clone(),
        },
        Some(stored) => Resolution::Reject {
            server_id: stored.server_id.clone(),
        },
    }
}

/// Whether a rejection reflects a genuinely stale write rather than a retry.
///
/// Equal clocks are what an idempotent resubmission looks like and are not
/// worth recording.
pub const fn is_stale_write(existing: &StoredMeta, incoming: &SyncMeta) -> bool {
    incoming.updated_at < existing.updated_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(updated_at: i64) -> StoredMeta {
        StoredMeta {
            server_id: Some("srv-1".to_string()),
            updated_at,
            deleted_at: None,
        }
    }

    #[test]
    fn missing_row_is_inserted() {
        assert_eq!(resolve(None, &SyncMeta::new("R1", 100)), Resolution::Insert);
    }

    #[test]
    fn newer_clock_updates_and_keeps_server_id() {
        assert_eq!(
            resolve(Some(&stored(100)), &SyncMeta::new("R1", 101)),
            Resolution::Update {
                server_id: Some("srv-1".to_string())
            }
        );
    }

    #[test]
    fn equal_clock_is_rejected() {
        let resolution = resolve(Some(&stored(100)), &SyncMeta::new("R1", 100));
        assert!(resolution.is_reject());
        assert!(!is_stale_write(&stored(100), &SyncMeta::new("R1", 100)));
    }

    #[test]
    fn older_clock_is_rejected_with_existing_server_id() {
        assert_eq!(
            resolve(Some(&stored(200)), &SyncMeta::new("P1", 150)),
            Resolution::Reject {
                server_id: Some("srv-1".to_string())
            }
        );
        assert!(is_stale_write(&stored(200), &SyncMeta::new("P1", 150)));
    }

    #[test]
    fn tombstone_follows_the_same_rule() {
        let tombstone = SyncMeta::new("W1", 90).deleted(90);
        assert!(resolve(Some(&stored(100)), &tombstone).is_reject());

        let tombstone = SyncMeta::new("W1", 150).deleted(150);
        assert!(matches!(
            resolve(Some(&stored(100)), &tombstone),
            Resolution::Update { .. }
        ));
    }

    #[test]
    fn winner_is_independent_of_arrival_order() {
        let older = SyncMeta::new("P1", 150);
        let newer = SyncMeta::new("P1", 200);

        // newer first, then older
        let after_newer = StoredMeta {
            server_id: None,
            updated_at: newer.updated_at,
            deleted_at: None,
        };
        assert!(resolve(Some(&after_newer), &older).is_reject());

        // older first, then newer
        let after_older = StoredMeta {
            server_id: None,
            updated_at: older.updated_at,
            deleted_at: None,
        };
        assert!(!resolve(Some(&after_older), &newer).is_reject());
    }
}
