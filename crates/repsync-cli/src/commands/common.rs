use std::env;
use std::path::{Path, PathBuf};

use repsync_core::models::SyncConflict;
use repsync_core::services::LocalStore;
use repsync_core::SyncRecord;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub kind: String,
    pub client_id: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub incoming_device_id: Option<String>,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        kind: conflict.kind.to_string(),
        client_id: conflict.client_id.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        incoming_device_id: conflict.incoming_device_id.clone(),
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {}  {}={}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.kind,
                conflict.client_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_record_lines(records: &[SyncRecord], now_ms: i64) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let server = record.server_id().unwrap_or("unsynced");
            let deleted = if record.deleted_at().is_some() {
                "  [deleted]"
            } else {
                ""
            };
            format!(
                "{}  {:<12}  {}  {server}{deleted}",
                record.client_id(),
                format_relative_time(record.updated_at(), now_ms),
                record.kind(),
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("REPSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repsync")
        .join("repsync.db")
}

pub async fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path).await?)
}

pub fn write_output(output_path: Option<&Path>, rendered: &str) -> Result<(), CliError> {
    if let Some(path) = output_path {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}
