//! Snapshot import

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::SnapshotDocument;
use crate::db::{Database, LibSqlRecordRepository};
use crate::error::Result;
use crate::merge::merge_batch;
use crate::models::EntityKind;

/// Per-kind counts of an import.
///
/// Serializes as `{"<kind>Imported": n, "<kind>Skipped": n}` for every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    imported: BTreeMap<EntityKind, usize>,
    skipped: BTreeMap<EntityKind, usize>,
}

impl ImportReport {
    /// Records inserted or updated
    pub fn imported(&self, kind: EntityKind) -> usize {
        self.imported.get(&kind).copied().unwrap_or_default()
    }

    /// Records not newer than the stored copy, or of an unsupported kind
    pub fn skipped(&self, kind: EntityKind) -> usize {
        self.skipped.get(&kind).copied().unwrap_or_default()
    }

    pub fn total_imported(&self) -> usize {
        self.imported.values().sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl Serialize for ImportReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EntityKind::ALL.len() * 2))?;
        for kind in EntityKind::ALL {
            map.serialize_entry(&format!("{}Imported", kind.wire_name()), &self.imported(kind))?;
            map.serialize_entry(&format!("{}Skipped", kind.wire_name()), &self.skipped(kind))?;
        }
        map.end()
    }
}

/// Restore a snapshot into the device store in one transaction.
pub async fn import(db: &Database, document: &SnapshotDocument) -> Result<ImportReport> {
    document.ensure_supported()?;

    let capabilities = db.capabilities().await?;
    db.begin().await?;
    let result = {
        let repo = LibSqlRecordRepository::device(db.connection(), capabilities);
        merge_batch(&repo, &document.data).await
    };
    let merged = db.finish(result).await?;

    let mut report = ImportReport::default();
    for kind in EntityKind::ALL {
        let imported = merged.applied(kind);
        let skipped = merged.rejected(kind) + merged.skipped(kind);
        if imported > 0 {
            report.imported.insert(kind, imported);
        }
        if skipped > 0 {
            report.skipped.insert(kind, skipped);
        }
    }

    tracing::info!(
        "Imported snapshot version {}: {} records imported, {} skipped",
        document.version,
        report.total_imported(),
        report.total_skipped()
    );
    Ok(report)
}
