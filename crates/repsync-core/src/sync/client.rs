//! One push-then-pull sync cycle against a transport.

use crate::error::{Error, Result};
use crate::protocol::{PullRequest, PushRequest};
use crate::services::LocalStore;

use super::transport::SyncTransport;

/// What one cycle moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Local records sent
    pub pushed: usize,
    /// Local rows that learned a server id
    pub mapped: usize,
    /// Remote records received
    pub pulled: usize,
    /// Remote records that changed the local store
    pub applied: usize,
    /// Server cursor for the next pull
    pub sync_time: i64,
}

/// Client side of the sync protocol for one device store.
pub struct SyncClient<T> {
    store: LocalStore,
    transport: T,
    device_name: Option<String>,
    platform: Option<String>,
}

impl<T: SyncTransport> SyncClient<T> {
    pub const fn new(store: LocalStore, transport: T) -> Self {
        Self {
            store,
            transport,
            device_name: None,
            platform: None,
        }
    }

    #[must_use]
    pub fn with_device_info(
        mut self,
        device_name: Option<String>,
        platform: Option<String>,
    ) -> Self {
        self.device_name = device_name;
        self.platform = platform;
        self
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Push pending local changes, acknowledge them with the returned server
    /// ids, then pull and merge remote changes.
    ///
    /// The push is sent even when nothing is pending so the server learns the
    /// device's pull cursor. Does not touch the persisted sync state; the
    /// caller records the outcome.
    pub async fn sync_once(&self) -> Result<SyncSummary> {
        let state = self.store.load_sync_state().await?;
        let device_id = self.store.device_id().await?;
        let mut summary = SyncSummary::default();

        let request = PushRequest {
            device_id: device_id.clone(),
            device_name: self.device_name.clone(),
            platform: self.platform.clone(),
            last_sync: state.last_sync_at,
            batch: self.store.pending_changes().await?,
        };
        summary.pushed = request.batch.len();
        let response = self
            .transport
            .push(&request)
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;
        summary.mapped = self
            .store
            .acknowledge_push(&request.batch, &response.id_mappings)
            .await?;

        let response = self
            .transport
            .pull(&PullRequest {
                device_id,
                last_sync: state.last_sync_at.unwrap_or_default(),
            })
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;
        summary.pulled = response.batch.len();
        summary.applied = self
            .store
            .apply_remote(&response.batch)
            .await?
            .total_applied();
        summary.sync_time = response.sync_time;

        tracing::info!(
            "Sync cycle: pushed {}, mapped {}, pulled {}, applied {}",
            summary.pushed,
            summary.mapped,
            summary.pulled,
            summary.applied
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, Routine, RoutineExercise, SyncMeta};
    use crate::services::{SyncService, SyncServiceOptions};
    use crate::sync::InProcessTransport;
    use pretty_assertions::assert_eq;

    async fn device(service: &SyncService) -> SyncClient<InProcessTransport> {
        let store = LocalStore::open_in_memory().await.unwrap();
        SyncClient::new(store, InProcessTransport::new(service.clone(), "user-a"))
    }

    async fn finish(client: &SyncClient<InProcessTransport>, summary: &SyncSummary) {
        let mut state = client.store().load_sync_state().await.unwrap();
        state.record_success(summary.sync_time, summary.sync_time);
        client.store().save_sync_state(&state).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_two_devices_converge() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let phone = device(&service).await;
        let tablet = device(&service).await;

        phone
            .store()
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
        phone
            .store()
            .save(RoutineExercise::new(
                SyncMeta::new("E1", 100),
                "R1",
                "bench-press",
                0,
            ))
            .await
            .unwrap();

        let summary = phone.sync_once().await.unwrap();
        assert_eq!(summary.pushed, 2);
        assert_eq!(summary.mapped, 2);
        finish(&phone, &summary).await;

        let summary = tablet.sync_once().await.unwrap();
        assert_eq!(summary.pushed, 0);
        assert_eq!(summary.applied, 2);
        finish(&tablet, &summary).await;

        let on_phone = phone.store().list(EntityKind::RoutineExercise).await.unwrap();
        let on_tablet = tablet.store().list(EntityKind::RoutineExercise).await.unwrap();
        assert_eq!(on_phone[0].server_id(), on_tablet[0].server_id());
        assert!(on_tablet[0].server_id().is_some());
    }

    fn routine_name(records: &[crate::models::SyncRecord]) -> serde_json::Value {
        serde_json::to_value(records).unwrap()[0]["name"].clone()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_newer_remote_edit_wins_locally() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let phone = device(&service).await;
        let tablet = device(&service).await;

        phone
            .store()
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
        let summary = phone.sync_once().await.unwrap();
        finish(&phone, &summary).await;
        let summary = tablet.sync_once().await.unwrap();
        finish(&tablet, &summary).await;

        tablet
            .store()
            .save(Routine::new(SyncMeta::new("R1", 200), "Push day"))
            .await
            .unwrap();
        let summary = tablet.sync_once().await.unwrap();
        assert_eq!(summary.pushed, 1);
        finish(&tablet, &summary).await;

        phone.sync_once().await.unwrap();
        let on_phone = phone.store().list(EntityKind::Routine).await.unwrap();
        assert_eq!(routine_name(&on_phone), "Push day");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_edit_after_first_sync_reaches_other_device() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let phone = device(&service).await;
        let tablet = device(&service).await;

        phone
            .store()
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
        let summary = phone.sync_once().await.unwrap();
        finish(&phone, &summary).await;

        // The clock is far behind the server cursor just recorded
        phone
            .store()
            .save(Routine::new(SyncMeta::new("R1", 200), "Push day"))
            .await
            .unwrap();
        assert_eq!(phone.store().pending_changes().await.unwrap().len(), 1);
        let summary = phone.sync_once().await.unwrap();
        assert_eq!(summary.pushed, 1);
        finish(&phone, &summary).await;
        assert!(phone.store().pending_changes().await.unwrap().is_empty());

        tablet.sync_once().await.unwrap();
        let on_tablet = tablet.store().list(EntityKind::Routine).await.unwrap();
        assert_eq!(routine_name(&on_tablet), "Push day");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pulled_records_are_not_pushed_back() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let phone = device(&service).await;
        let tablet = device(&service).await;

        phone
            .store()
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
        phone.sync_once().await.unwrap();

        let summary = tablet.sync_once().await.unwrap();
        assert_eq!(summary.applied, 1);
        assert!(tablet.store().pending_changes().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unauthenticated_transport_fails_cycle() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let store = LocalStore::open_in_memory().await.unwrap();
        let client = SyncClient::new(store, InProcessTransport::new(service, ""));

        let error = client.sync_once().await.unwrap_err();
        assert!(matches!(error, Error::Transport(_)));
    }
}
