use std::path::Path;

use repsync_core::util::now_millis;
use serde::Serialize;

use crate::commands::common::{format_relative_time, open_store};
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStatus {
    pub device_id: String,
    pub schema_version: i32,
    pub missing_kinds: Vec<String>,
    pub pending_changes: usize,
    pub last_sync_at: Option<i64>,
    pub consecutive_failures: u32,
    pub persistent_error: bool,
    pub last_error: Option<String>,
}

pub async fn load_status(db_path: &Path) -> Result<LocalStatus, CliError> {
    let store = open_store(db_path).await?;
    let capabilities = store.capabilities().await?;
    let state = store.load_sync_state().await?;

    Ok(LocalStatus {
        device_id: store.device_id().await?,
        schema_version: store.schema_version().await?,
        missing_kinds: capabilities
            .missing()
            .into_iter()
            .map(|kind| kind.to_string())
            .collect(),
        pending_changes: store.pending_changes().await?.len(),
        last_sync_at: state.last_sync_at,
        consecutive_failures: state.consecutive_failures,
        persistent_error: state.persistent_error,
        last_error: state.last_error,
    })
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let status = load_status(db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status, now_millis()) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(status: &LocalStatus, now_ms: i64) -> Vec<String> {
    let mut lines = vec![
        format!("Device:          {}", status.device_id),
        format!("Schema version:  {}", status.schema_version),
        format!("Pending changes: {}", status.pending_changes),
        format!(
            "Last sync:       {}",
            status
                .last_sync_at
                .map_or_else(|| "never".to_string(), |at| format_relative_time(at, now_ms))
        ),
    ];
    if !status.missing_kinds.is_empty() {
        lines.push(format!("Unsupported:     {}", status.missing_kinds.join(", ")));
    }
    if status.persistent_error {
        lines.push(format!(
            "Sync error:      {} ({} consecutive failures)",
            status.last_error.as_deref().unwrap_or("unknown"),
            status.consecutive_failures
        ));
    }
    lines
}
