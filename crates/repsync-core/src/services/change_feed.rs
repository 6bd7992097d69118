//! Pull change feed and device status

use super::sync_service::{require_device_id, SyncService};
use crate::db::{LibSqlDeviceRepository, LibSqlRecordRepository};
use crate::error::Result;
use crate::graph;
use crate::models::EntityBatch;
use crate::protocol::{PullRequest, PullResponse, StatusResponse};
use crate::util::now_millis;

impl SyncService {
    /// Every record of the user changed after `last_sync`, tombstones
    /// included, parents before children. Read only.
    pub async fn pull(&self, user_id: &str, request: &PullRequest) -> Result<PullResponse> {
        require_device_id(&request.device_id)?;

        let db = self.db.lock().await;
        // Taken under the lock so no push can land between cursor and read
        let sync_time = now_millis();
        let horizon = self.tombstone_horizon(sync_time);

        let repo = LibSqlRecordRepository::user(db.connection(), user_id);
        let mut batch = EntityBatch::new();
        for kind in graph::merge_order() {
            let records = repo
                .list_changed_since(kind, request.last_sync, horizon)
                .await?;
            batch.set(kind, records);
        }

        tracing::debug!(
            "Pull for device {} since {}: {} records",
            request.device_id,
            request.last_sync,
            batch.len()
        );

        Ok(PullResponse { sync_time, batch })
    }

    /// Pull cursor a device last reported on push, and how many of the
    /// user's records changed after it.
    pub async fn status(
        &self,
        user_id: &str,
        device_id: &str,
        subscription: Option<String>,
    ) -> Result<StatusResponse> {
        require_device_id(device_id)?;

        let db = self.db.lock().await;
        let device = LibSqlDeviceRepository::new(db.connection(), user_id)
            .get(device_id)
            .await?;
        let last_sync_time = device.and_then(|device| device.last_sync_at);

        let repo = LibSqlRecordRepository::user(db.connection(), user_id);
        let since = last_sync_time.unwrap_or_default();
        let mut pending_changes = 0;
        for kind in graph::merge_order() {
            pending_changes += repo.count_changed_since(kind, since).await?;
        }

        Ok(StatusResponse {
            last_sync_time,
            pending_changes,
            authenticated: true,
            subscription,
        })
    }
}
