//! Push ingestion

use super::sync_service::{require_device_id, SyncService};
use crate::db::{DeviceRegistration, LibSqlDeviceRepository, LibSqlRecordRepository};
use crate::error::{Error, Result};
use crate::merge::{merge_batch, MergeReport};
use crate::protocol::{PushRequest, PushResponse};
use crate::util::now_millis;

impl SyncService {
    /// Merge a device's batch into the user's records.
    ///
    /// All or nothing: the device registration, its reported pull cursor and
    /// every record commit together, or nothing does.
    pub async fn push(&self, user_id: &str, request: &PushRequest) -> Result<PushResponse> {
        let sync_time = now_millis();
        require_device_id(&request.device_id)?;

        let record_count = request.batch.len();
        if record_count > self.options.max_push_records {
            return Err(Error::InvalidInput(format!(
                "push contains {record_count} records, limit is {}",
                self.options.max_push_records
            )));
        }

        let registration = DeviceRegistration {
            device_id: request.device_id.clone(),
            device_name: request.device_name.clone(),
            platform: request.platform.clone(),
        };

        let db = self.db.lock().await;
        db.begin().await?;
        let result = async {
            let devices = LibSqlDeviceRepository::new(db.connection(), user_id);
            devices.register(&registration, sync_time).await?;
            if let Some(last_sync) = request.last_sync {
                devices.mark_synced(&request.device_id, last_sync).await?;
            }
            let repo = LibSqlRecordRepository::user(db.connection(), user_id);
            merge_batch(&repo, &request.batch).await
        }
        .await;
        let report: MergeReport = db.finish(result).await.inspect_err(|error| {
            tracing::warn!(
                "Rejected push of {record_count} records from device {}: {error}",
                request.device_id
            );
        })?;

        tracing::info!(
            "Push from device {}: {record_count} records, {} applied",
            request.device_id,
            report.total_applied()
        );

        Ok(PushResponse {
            sync_time,
            id_mappings: report.id_mappings(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EntityBatch, EntityKind, PersonalRecord, Routine, RoutineExercise, SyncMeta,
    };
    use crate::services::SyncServiceOptions;
    use crate::PullRequest;
    use pretty_assertions::assert_eq;

    async fn service() -> SyncService {
        SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap()
    }

    fn request(batch: EntityBatch) -> PushRequest {
        PushRequest {
            device_id: "phone-1".to_string(),
            device_name: Some("Pixel".to_string()),
            platform: Some("android".to_string()),
            last_sync: None,
            batch,
        }
    }

    fn routine_with_exercise() -> EntityBatch {
        EntityBatch::new()
            .with(Routine::new(SyncMeta::new("R1", 100), "Push day"))
            .with(RoutineExercise::new(
                SyncMeta::new("E1", 100),
                "R1",
                "bench-press",
                0,
            ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parent_and_child_are_both_mapped() {
        let service = service().await;

        let response = service
            .push("user-a", &request(routine_with_exercise()))
            .await
            .unwrap();

        let routine_id = &response.id_mappings[&EntityKind::Routine]["R1"];
        let exercise_id = &response.id_mappings[&EntityKind::RoutineExercise]["E1"];
        assert!(!routine_id.is_empty());
        assert_ne!(routine_id, exercise_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_is_idempotent() {
        let service = service().await;
        let request = request(routine_with_exercise());

        let first = service.push("user-a", &request).await.unwrap();
        let second = service.push("user-a", &request).await.unwrap();

        assert_eq!(first.id_mappings, second.id_mappings);
        let pulled = service
            .pull(
                "user-a",
                &PullRequest {
                    device_id: "phone-1".to_string(),
                    last_sync: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(pulled.batch.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_update_reports_existing_server_id() {
        let service = service().await;
        let first = service
            .push(
                "user-a",
                &request(EntityBatch::new().with(PersonalRecord::new(
                    SyncMeta::new("P1", 200),
                    "deadlift",
                    "max_weight",
                    180.0,
                    200,
                ))),
            )
            .await
            .unwrap();

        let second = service
            .push(
                "user-a",
                &request(EntityBatch::new().with(PersonalRecord::new(
                    SyncMeta::new("P1", 150),
                    "deadlift",
                    "max_weight",
                    170.0,
                    150,
                ))),
            )
            .await
            .unwrap();

        assert_eq!(
            second.id_mappings[&EntityKind::PersonalRecord]["P1"],
            first.id_mappings[&EntityKind::PersonalRecord]["P1"]
        );
        let pulled = service
            .pull(
                "user-a",
                &PullRequest {
                    device_id: "phone-1".to_string(),
                    last_sync: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            pulled.batch.records(EntityKind::PersonalRecord)[0].updated_at(),
            200
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_push_commits_nothing() {
        let service = service().await;
        let batch = EntityBatch::new()
            .with(Routine::new(SyncMeta::new("R1", 100), "Push day"))
            .with(RoutineExercise::new(
                SyncMeta::new("E9", 100),
                "R-missing",
                "bench-press",
                0,
            ));

        let mut request = request(batch);
        request.last_sync = Some(50);
        let error = service.push("user-a", &request).await.unwrap_err();
        assert!(error.is_validation());

        let status = service.status("user-a", "phone-1", None).await.unwrap();
        assert_eq!(status.last_sync_time, None);

        let pulled = service
            .pull(
                "user-a",
                &PullRequest {
                    device_id: "phone-1".to_string(),
                    last_sync: 0,
                },
            )
            .await
            .unwrap();
        assert!(pulled.batch.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_oversize_push_is_rejected() {
        let service = SyncService::open_in_memory(SyncServiceOptions {
            max_push_records: 1,
            ..SyncServiceOptions::default()
        })
        .await
        .unwrap();

        let error = service
            .push("user-a", &request(routine_with_exercise()))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_device_id_is_rejected() {
        let service = service().await;
        let mut request = request(routine_with_exercise());
        request.device_id = "  ".to_string();

        assert!(matches!(
            service.push("user-a", &request).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_same_client_id_for_two_users() {
        let service = service().await;

        let alice = service
            .push("alice", &request(routine_with_exercise()))
            .await
            .unwrap();
        let bob = service
            .push("bob", &request(routine_with_exercise()))
            .await
            .unwrap();

        assert_ne!(
            alice.id_mappings[&EntityKind::Routine]["R1"],
            bob.id_mappings[&EntityKind::Routine]["R1"]
        );
    }
}
