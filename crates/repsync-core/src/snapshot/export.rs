//! Snapshot export

use chrono::Utc;

use super::{SnapshotDocument, SNAPSHOT_VERSION};
use crate::db::{Database, LibSqlRecordRepository};
use crate::error::Result;
use crate::graph;
use crate::models::EntityBatch;

/// Walk every kind in dependency order into one document.
///
/// Kinds the store has no table for come out as empty lists. Tombstones are
/// kept so a restore carries deletions across. Without an `app_version`
/// the document is stamped with this library's version.
pub async fn export(db: &Database, app_version: Option<&str>) -> Result<SnapshotDocument> {
    let capabilities = db.capabilities().await?;
    let repo = LibSqlRecordRepository::device(db.connection(), capabilities);

    let mut data = EntityBatch::new();
    for kind in graph::merge_order() {
        data.set(kind, repo.list(kind).await?);
    }

    tracing::info!("Exported snapshot with {} records", data.len());

    Ok(SnapshotDocument {
        version: SNAPSHOT_VERSION,
        exported_at: Utc::now(),
        app_version: app_version
            .unwrap_or(env!("CARGO_PKG_VERSION"))
            .to_string(),
        data,
    })
}
