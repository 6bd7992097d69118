use std::path::Path;

use repsync_core::util::now_millis;
use repsync_core::EntityKind;

use crate::commands::common::{format_record_lines, open_store};
use crate::error::CliError;

pub async fn run_list(kind: EntityKind, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let records = store.list(kind).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No {kind} stored.");
    } else {
        for line in format_record_lines(&records, now_millis()) {
            println!("{line}");
        }
    }

    Ok(())
}
