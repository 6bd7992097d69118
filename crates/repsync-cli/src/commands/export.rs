use std::path::Path;

use crate::commands::common::{open_store, write_output};
use crate::error::CliError;

pub async fn run_export(
    output_path: Option<&Path>,
    app_version: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let snapshot = store.export_snapshot(app_version).await?;
    let rendered = snapshot.to_json()?;

    match output_path {
        Some(dir) if dir.is_dir() => {
            let path = dir.join(snapshot.suggested_file_name());
            write_output(Some(&path), &rendered)
        }
        other => write_output(other, &rendered),
    }
}
