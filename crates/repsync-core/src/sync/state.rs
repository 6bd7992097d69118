//! Sync phases and persisted sync bookkeeping.

use serde::{Deserialize, Serialize};

/// Phase of the sync orchestrator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Checking,
    Syncing,
    Success,
    Failed,
}

/// Bookkeeping that survives restarts, persisted in the device store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Server `syncTime` of the last successful cycle; the pull cursor
    pub last_sync_at: Option<i64>,
    /// Device clock of the last attempt, successful or not
    pub last_attempt_at: Option<i64>,
    pub consecutive_failures: u32,
    /// Set once consecutive failures reach the threshold
    pub persistent_error: bool,
    pub last_error: Option<String>,
}

impl SyncState {
    pub fn record_success(&mut self, sync_time: i64, attempted_at: i64) {
        self.last_sync_at = Some(sync_time);
        self.last_attempt_at = Some(attempted_at);
        self.consecutive_failures = 0;
        self.persistent_error = false;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, attempted_at: i64, threshold: u32, error: impl Into<String>) {
        self.last_attempt_at = Some(attempted_at);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= threshold {
            self.persistent_error = true;
        }
        self.last_error = Some(error.into());
    }

    /// Whether the last attempt happened less than `min_interval_ms` before `now`.
    pub fn attempted_within(&self, now: i64, min_interval_ms: i64) -> bool {
        self.last_attempt_at
            .is_some_and(|attempted| now.saturating_sub(attempted) < min_interval_ms)
    }
}
