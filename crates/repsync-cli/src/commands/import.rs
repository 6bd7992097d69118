use std::path::Path;

use repsync_core::snapshot::{ImportReport, SnapshotDocument};
use repsync_core::EntityKind;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_import(input_path: &Path, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let payload = std::fs::read_to_string(input_path)?;
    let snapshot = SnapshotDocument::from_json(&payload)?;

    let store = open_store(db_path).await?;
    let report = store.import_snapshot(&snapshot).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_import_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

/// One line per kind that moved, then totals.
pub fn format_import_lines(report: &ImportReport) -> Vec<String> {
    let mut lines = EntityKind::ALL
        .into_iter()
        .filter(|kind| report.imported(*kind) + report.skipped(*kind) > 0)
        .map(|kind| {
            format!(
                "{kind}: {} imported, {} skipped",
                report.imported(kind),
                report.skipped(kind)
            )
        })
        .collect::<Vec<String>>();
    lines.push(format!(
        "Total: {} imported, {} skipped",
        report.total_imported(),
        report.total_skipped()
    ));
    lines
}
