//! Decides when a sync cycle runs.
//!
//! Triggers come from the app: a finished workout (runs immediately) or a
//! periodic foreground check (throttled). A cycle only starts when the user
//! is signed in and the server answers a probe. Failures are counted and
//! surface as a persistent error after a threshold; there is no retry loop,
//! the next trigger simply tries again.

use std::time::Duration;

use crate::config::ClientSyncConfig;
use crate::error::Result;
use crate::util::now_millis;

use super::client::{SyncClient, SyncSummary};
use super::state::SyncPhase;
use super::transport::SyncTransport;

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Local data was just completed; bypasses the throttle
    LocalCompletion,
    /// Periodic check while the app is in the foreground
    ForegroundCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Throttled,
    Unauthenticated,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Succeeded(SyncSummary),
    Failed {
        error: String,
        /// Whether the failure threshold has been reached
        persistent: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub min_foreground_interval: Duration,
    pub failure_threshold: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&ClientSyncConfig::default())
    }
}

impl From<&ClientSyncConfig> for OrchestratorSettings {
    fn from(config: &ClientSyncConfig) -> Self {
        Self {
            min_foreground_interval: config.min_foreground_interval(),
            failure_threshold: config.failure_threshold.max(1),
        }
    }
}

/// Drives [`SyncClient`] cycles for one device session.
pub struct SyncOrchestrator<T> {
    client: SyncClient<T>,
    settings: OrchestratorSettings,
    phase: SyncPhase,
}

impl<T: SyncTransport> SyncOrchestrator<T> {
    pub const fn new(client: SyncClient<T>, settings: OrchestratorSettings) -> Self {
        Self {
            client,
            settings,
            phase: SyncPhase::Idle,
        }
    }

    /// Phase after the last trigger: `Success` or `Failed` once a cycle ran,
    /// `Idle` when it was skipped.
    pub const fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub const fn client(&self) -> &SyncClient<T> {
        &self.client
    }

    pub async fn trigger(&mut self, trigger: Trigger) -> Result<SyncOutcome> {
        self.trigger_at(trigger, now_millis()).await
    }

    /// Handle a trigger as if the device clock read `now` (Unix ms).
    ///
    /// Errors only when the local store itself fails; sync failures are
    /// reported as [`SyncOutcome::Failed`].
    pub async fn trigger_at(&mut self, trigger: Trigger, now: i64) -> Result<SyncOutcome> {
        self.phase = SyncPhase::Idle;
        let store = self.client.store().clone();
        let mut state = store.load_sync_state().await?;

        let min_interval =
            i64::try_from(self.settings.min_foreground_interval.as_millis()).unwrap_or(i64::MAX);
        if trigger == Trigger::ForegroundCheck && state.attempted_within(now, min_interval) {
            tracing::debug!("Foreground sync throttled");
            return Ok(SyncOutcome::Skipped(SkipReason::Throttled));
        }

        self.phase = SyncPhase::Checking;
        if !self.client.transport().is_authenticated() {
            self.phase = SyncPhase::Idle;
            return Ok(SyncOutcome::Skipped(SkipReason::Unauthenticated));
        }
        if !self.client.transport().probe().await {
            self.phase = SyncPhase::Idle;
            return Ok(SyncOutcome::Skipped(SkipReason::Offline));
        }

        self.phase = SyncPhase::Syncing;
        let outcome = match self.client.sync_once().await {
            Ok(summary) => {
                state.record_success(summary.sync_time, now);
                self.phase = SyncPhase::Success;
                SyncOutcome::Succeeded(summary)
            }
            Err(error) => {
                let message = error.to_string();
                state.record_failure(now, self.settings.failure_threshold, message.clone());
                tracing::warn!(
                    "Sync failed ({} consecutive): {message}",
                    state.consecutive_failures
                );
                self.phase = SyncPhase::Failed;
                SyncOutcome::Failed {
                    error: message,
                    persistent: state.persistent_error,
                }
            }
        };

        store.save_sync_state(&state).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
    use crate::services::LocalStore;
    use crate::sync::transport::{SyncTransportError, SyncTransportResult};
    use pretty_assertions::assert_eq;

    const MINUTE: i64 = 60_000;

    #[derive(Clone, Default)]
    struct FakeTransport {
        signed_out: bool,
        offline: bool,
        failing: Arc<AtomicBool>,
        pulls: Arc<AtomicUsize>,
    }

    impl SyncTransport for FakeTransport {
        fn is_authenticated(&self) -> bool {
            !self.signed_out
        }

        async fn probe(&self) -> bool {
            !self.offline
        }

        async fn push(&self, _request: &PushRequest) -> SyncTransportResult<PushResponse> {
            Ok(PushResponse::default())
        }

        async fn pull(&self, _request: &PullRequest) -> SyncTransportResult<PullResponse> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncTransportError::Api("HTTP 503".to_string()));
            }
            let count = self.pulls.fetch_add(1, Ordering::SeqCst);
            Ok(PullResponse {
                sync_time: 1_000 + i64::try_from(count).unwrap(),
                ..PullResponse::default()
            })
        }
    }

    async fn orchestrator(transport: FakeTransport) -> SyncOrchestrator<FakeTransport> {
        let store = LocalStore::open_in_memory().await.unwrap();
        SyncOrchestrator::new(
            SyncClient::new(store, transport),
            OrchestratorSettings::default(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_foreground_checks_are_throttled() {
        let transport = FakeTransport::default();
        let mut orchestrator = orchestrator(transport.clone()).await;

        let first = orchestrator
            .trigger_at(Trigger::ForegroundCheck, 10 * MINUTE)
            .await
            .unwrap();
        assert!(matches!(first, SyncOutcome::Succeeded(_)));
        assert_eq!(orchestrator.phase(), SyncPhase::Success);

        let second = orchestrator
            .trigger_at(Trigger::ForegroundCheck, 12 * MINUTE)
            .await
            .unwrap();
        assert_eq!(second, SyncOutcome::Skipped(SkipReason::Throttled));

        let third = orchestrator
            .trigger_at(Trigger::ForegroundCheck, 16 * MINUTE)
            .await
            .unwrap();
        assert!(matches!(third, SyncOutcome::Succeeded(_)));
        assert_eq!(transport.pulls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_completion_bypasses_throttle() {
        let mut orchestrator = orchestrator(FakeTransport::default()).await;

        orchestrator
            .trigger_at(Trigger::ForegroundCheck, 10 * MINUTE)
            .await
            .unwrap();
        let outcome = orchestrator
            .trigger_at(Trigger::LocalCompletion, 10 * MINUTE + 1)
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Succeeded(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_guards_return_to_idle_silently() {
        let mut signed_out = orchestrator(FakeTransport {
            signed_out: true,
            ..FakeTransport::default()
        })
        .await;
        assert_eq!(
            signed_out
                .trigger_at(Trigger::LocalCompletion, MINUTE)
                .await
                .unwrap(),
            SyncOutcome::Skipped(SkipReason::Unauthenticated)
        );
        assert_eq!(signed_out.phase(), SyncPhase::Idle);

        let mut offline = orchestrator(FakeTransport {
            offline: true,
            ..FakeTransport::default()
        })
        .await;
        assert_eq!(
            offline
                .trigger_at(Trigger::LocalCompletion, MINUTE)
                .await
                .unwrap(),
            SyncOutcome::Skipped(SkipReason::Offline)
        );

        // Skips are not failures
        let state = offline.client().store().load_sync_state().await.unwrap();
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.last_attempt_at, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failures_become_persistent_then_reset() {
        let transport = FakeTransport::default();
        transport.failing.store(true, Ordering::SeqCst);
        let mut orchestrator = orchestrator(transport.clone()).await;

        for attempt in 1..=3 {
            let outcome = orchestrator
                .trigger_at(Trigger::LocalCompletion, attempt * MINUTE)
                .await
                .unwrap();
            let SyncOutcome::Failed { persistent, .. } = outcome else {
                panic!("expected failure, got {outcome:?}");
            };
            assert_eq!(persistent, attempt == 3);
        }
        assert_eq!(orchestrator.phase(), SyncPhase::Failed);

        let state = orchestrator.client().store().load_sync_state().await.unwrap();
        assert_eq!(state.consecutive_failures, 3);
        assert!(state.persistent_error);

        transport.failing.store(false, Ordering::SeqCst);
        orchestrator
            .trigger_at(Trigger::LocalCompletion, 4 * MINUTE)
            .await
            .unwrap();

        let state = orchestrator.client().store().load_sync_state().await.unwrap();
        assert_eq!(state.consecutive_failures, 0);
        assert!(!state.persistent_error);
        assert_eq!(state.last_sync_at, Some(1_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_attempt_also_throttles_foreground() {
        let transport = FakeTransport::default();
        transport.failing.store(true, Ordering::SeqCst);
        let mut orchestrator = orchestrator(transport).await;

        orchestrator
            .trigger_at(Trigger::ForegroundCheck, 10 * MINUTE)
            .await
            .unwrap();
        let outcome = orchestrator
            .trigger_at(Trigger::ForegroundCheck, 11 * MINUTE)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::Throttled));
    }
}
