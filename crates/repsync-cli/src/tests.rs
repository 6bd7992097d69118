use pretty_assertions::assert_eq;
use repsync_core::config::ClientSyncConfig;
use repsync_core::models::{PersonalRecord, Routine, SyncConflict, SyncMeta};
use repsync_core::services::LocalStore;
use repsync_core::snapshot::SnapshotDocument;
use repsync_core::sync::{SkipReason, SyncCredentials, SyncOutcome, SyncSummary, Trigger};
use repsync_core::EntityKind;
use tempfile::TempDir;

use crate::commands::common::{
    format_record_lines, format_relative_time, format_sync_conflict_lines, format_sync_timestamp,
    sync_conflict_to_item,
};
use crate::commands::export::run_export;
use crate::commands::import::{format_import_lines, run_import};
use crate::commands::status::{format_status_lines, load_status};
use crate::commands::sync::{credentials_from_lookup, describe_outcome, sync_with_config};
use crate::error::CliError;

fn conflict() -> SyncConflict {
    SyncConflict {
        id: 7,
        kind: EntityKind::PersonalRecord,
        client_id: "P1".to_string(),
        local_updated_at: 300,
        incoming_updated_at: 200,
        incoming_device_id: Some("tablet".to_string()),
        resolved_at: 0,
        strategy: "last_write_wins".to_string(),
    }
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let rendered = format_sync_conflict_lines(&[conflict()]);
    assert_eq!(
        rendered,
        vec![
            "1970-01-01 00:00:00 UTC  last_write_wins  personalRecords=P1  local=300 incoming=200"
                .to_string()
        ]
    );
}

#[test]
fn sync_conflict_item_uses_wire_kind() {
    let item = sync_conflict_to_item(&conflict());
    assert_eq!(item.kind, "personalRecords");
    assert_eq!(item.incoming_device_id.as_deref(), Some("tablet"));
}

#[test]
fn format_relative_time_buckets() {
    let minute = 60_000;
    assert_eq!(format_relative_time(0, 30_000), "just now");
    assert_eq!(format_relative_time(0, 5 * minute), "5m ago");
    assert_eq!(format_relative_time(0, 3 * 60 * minute), "3h ago");
    assert_eq!(format_relative_time(0, 15 * 24 * 60 * minute), "2w ago");
}

#[test]
fn format_record_lines_mark_unsynced_and_deleted() {
    let meta = SyncMeta::new("R1", 0).deleted(0);
    let lines = format_record_lines(&[Routine::new(meta, "Legs").into()], 30_000);

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("R1"));
    assert!(lines[0].contains("unsynced"));
    assert!(lines[0].ends_with("[deleted]"));
}

#[test]
fn credentials_are_read_from_lookup() {
    let credentials = credentials_from_lookup(|key| match key {
        "REPSYNC_ACCESS_TOKEN" => Some("token".to_string()),
        _ => None,
    });
    assert_eq!(credentials.access_token.as_deref(), Some("token"));
    assert_eq!(credentials.user_id, None);
}

#[test]
fn describe_outcome_turns_failures_into_errors() {
    let summary = SyncSummary {
        pushed: 2,
        pulled: 3,
        applied: 1,
        ..SyncSummary::default()
    };
    assert_eq!(
        describe_outcome(&SyncOutcome::Succeeded(summary)).unwrap(),
        "Sync completed: pushed 2, pulled 3, applied 1"
    );
    assert!(describe_outcome(&SyncOutcome::Skipped(SkipReason::Offline))
        .unwrap()
        .contains("unreachable"));

    let error = describe_outcome(&SyncOutcome::Failed {
        error: "HTTP 503".to_string(),
        persistent: true,
    })
    .unwrap_err();
    assert!(error.to_string().contains("failing repeatedly"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_requires_api_base_url() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("repsync.db");

    let error = sync_with_config(
        &ClientSyncConfig::default(),
        SyncCredentials::default(),
        Trigger::LocalCompletion,
        None,
        &db_path,
    )
    .await
    .unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_without_token_is_skipped() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("repsync.db");
    let config = ClientSyncConfig {
        api_base_url: Some("http://127.0.0.1:9".to_string()),
        ..ClientSyncConfig::default()
    };

    let outcome = sync_with_config(
        &config,
        SyncCredentials::default(),
        Trigger::LocalCompletion,
        None,
        &db_path,
    )
    .await
    .unwrap();
    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::Unauthenticated));
}

#[tokio::test(flavor = "multi_thread")]
async fn export_then_import_restores_into_fresh_store() {
    let dir = TempDir::new().unwrap();
    let source_path = dir.path().join("source.db");
    let target_path = dir.path().join("target.db");
    let snapshot_path = dir.path().join("backup.json");

    {
        let store = LocalStore::open_path(&source_path).await.unwrap();
        store
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
        store
            .save(PersonalRecord::new(
                SyncMeta::new("P1", 100),
                "bench-press",
                "max_weight",
                100.0,
                100,
            ))
            .await
            .unwrap();
    }

    run_export(Some(&snapshot_path), Some("2.4.0"), &source_path)
        .await
        .unwrap();
    let snapshot =
        SnapshotDocument::from_json(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot.app_version, "2.4.0");
    assert_eq!(snapshot.data.len(), 2);

    run_import(&snapshot_path, false, &target_path).await.unwrap();

    let restored = LocalStore::open_path(&target_path).await.unwrap();
    assert_eq!(restored.list(EntityKind::Routine).await.unwrap().len(), 1);
    assert_eq!(restored.list(EntityKind::PersonalRecord).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn export_into_directory_uses_suggested_name() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("repsync.db");
    let backups = dir.path().join("backups");
    std::fs::create_dir_all(&backups).unwrap();

    run_export(Some(&backups), None, &db_path).await.unwrap();

    let names = std::fs::read_dir(&backups)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<String>>();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("repsync-snapshot-"));
    assert!(names[0].ends_with(".json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn import_rejects_unsupported_snapshot_version() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("repsync.db");
    let snapshot_path = dir.path().join("old.json");
    std::fs::write(
        &snapshot_path,
        r#"{"version": 0, "exportedAt": 1, "data": {}}"#,
    )
    .unwrap();

    let error = run_import(&snapshot_path, false, &db_path)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(repsync_core::Error::UnsupportedSnapshot(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn import_report_lines_list_moved_kinds_only() {
    let store = LocalStore::open_in_memory().await.unwrap();
    let mut snapshot = store.export_snapshot(None).await.unwrap();
    snapshot
        .data
        .push(Routine::new(SyncMeta::new("R1", 100), "Push"));

    let report = store.import_snapshot(&snapshot).await.unwrap();
    assert_eq!(
        format_import_lines(&report),
        vec![
            "routines: 1 imported, 0 skipped".to_string(),
            "Total: 1 imported, 0 skipped".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn status_reports_pending_changes_for_new_store() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("repsync.db");
    {
        let store = LocalStore::open_path(&db_path).await.unwrap();
        store
            .save(Routine::new(SyncMeta::new("R1", 100), "Push"))
            .await
            .unwrap();
    }

    let status = load_status(&db_path).await.unwrap();
    assert_eq!(status.pending_changes, 1);
    assert_eq!(status.last_sync_at, None);
    assert!(status.missing_kinds.is_empty());

    let lines = format_status_lines(&status, 0);
    assert!(lines.contains(&"Last sync:       never".to_string()));
}
