use std::path::Path;

use repsync_core::config::ClientSyncConfig;
use repsync_core::sync::{
    HttpSyncTransport, OrchestratorSettings, SkipReason, SyncClient, SyncCredentials,
    SyncOrchestrator, SyncOutcome, Trigger,
};

use crate::commands::common::{
    format_sync_conflict_lines, open_store, sync_conflict_to_item, SyncConflictItem,
};
use crate::error::CliError;

const ENV_ACCESS_TOKEN: &str = "REPSYNC_ACCESS_TOKEN";
const ENV_USER_ID: &str = "REPSYNC_USER_ID";

pub async fn run_sync(
    foreground: bool,
    device_name: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let config = ClientSyncConfig::from_env()?;
    let credentials = credentials_from_lookup(|key| std::env::var(key).ok());
    let trigger = if foreground {
        Trigger::ForegroundCheck
    } else {
        Trigger::LocalCompletion
    };

    let outcome = sync_with_config(&config, credentials, trigger, device_name, db_path).await?;
    println!("{}", describe_outcome(&outcome)?);
    Ok(())
}

pub async fn sync_with_config(
    config: &ClientSyncConfig,
    credentials: SyncCredentials,
    trigger: Trigger,
    device_name: Option<String>,
    db_path: &Path,
) -> Result<SyncOutcome, CliError> {
    let base_url = config
        .api_base_url
        .as_deref()
        .ok_or(CliError::SyncNotConfigured)?;
    let transport = HttpSyncTransport::new(base_url, config.probe_timeout(), credentials)?;

    let store = open_store(db_path).await?;
    let client = SyncClient::new(store, transport)
        .with_device_info(device_name, Some(std::env::consts::OS.to_string()));
    let mut orchestrator = SyncOrchestrator::new(client, OrchestratorSettings::from(config));
    Ok(orchestrator.trigger(trigger).await?)
}

pub fn credentials_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SyncCredentials {
    SyncCredentials {
        access_token: lookup(ENV_ACCESS_TOKEN),
        user_id: lookup(ENV_USER_ID),
    }
}

/// Human summary of a finished trigger; failures become errors.
pub fn describe_outcome(outcome: &SyncOutcome) -> Result<String, CliError> {
    match outcome {
        SyncOutcome::Succeeded(summary) => Ok(format!(
            "Sync completed: pushed {}, pulled {}, applied {}",
            summary.pushed, summary.pulled, summary.applied
        )),
        SyncOutcome::Skipped(SkipReason::Throttled) => {
            Ok("Sync skipped: last attempt was too recent".to_string())
        }
        SyncOutcome::Skipped(SkipReason::Unauthenticated) => Ok(format!(
            "Sync skipped: not signed in (set {ENV_ACCESS_TOKEN})"
        )),
        SyncOutcome::Skipped(SkipReason::Offline) => {
            Ok("Sync skipped: server is unreachable".to_string())
        }
        SyncOutcome::Failed { error, persistent } => {
            let message = if *persistent {
                format!("{error} (sync has been failing repeatedly)")
            } else {
                error.clone()
            };
            Err(CliError::SyncFailed(message))
        }
    }
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = store.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
