//! Batch merge engine
//!
//! One loop serves push ingestion, snapshot import and pulled-change
//! application: kinds in dependency order, records in batch order, each
//! record validated, resolved and applied through a [`RecordRepository`].
//! Callers own the transaction; any error returned here must roll it back.

use std::collections::BTreeMap;

use crate::conflict::{self, Resolution};
use crate::db::RecordRepository;
use crate::error::{Result, ValidationError, ValidationReason};
use crate::graph;
use crate::models::{EntityBatch, EntityKind, SyncRecord};

/// What happened to one record during a merge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEntry {
    pub kind: EntityKind,
    pub client_id: String,
    pub outcome: MergeOutcome,
    /// Server id the record is stored under, if the store knows one
    pub server_id: Option<String>,
}

/// Per-record outcomes of one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    entries: Vec<MergeEntry>,
    skipped: BTreeMap<EntityKind, usize>,
}

impl MergeReport {
    pub fn entries(&self) -> &[MergeEntry] {
        &self.entries
    }

    fn count(&self, kind: EntityKind, outcome: MergeOutcome) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind && entry.outcome == outcome)
            .count()
    }

    pub fn inserted(&self, kind: EntityKind) -> usize {
        self.count(kind, MergeOutcome::Inserted)
    }

    pub fn updated(&self, kind: EntityKind) -> usize {
        self.count(kind, MergeOutcome::Updated)
    }

    pub fn rejected(&self, kind: EntityKind) -> usize {
        self.count(kind, MergeOutcome::Rejected)
    }

    /// Records inserted or updated
    pub fn applied(&self, kind: EntityKind) -> usize {
        self.inserted(kind) + self.updated(kind)
    }

    /// Records of a kind the store has no table for
    pub fn skipped(&self, kind: EntityKind) -> usize {
        self.skipped.get(&kind).copied().unwrap_or_default()
    }

    pub fn total_applied(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome != MergeOutcome::Rejected)
            .count()
    }

    /// `clientId -> serverId` per kind, rejected records included.
    pub fn id_mappings(&self) -> BTreeMap<EntityKind, BTreeMap<String, String>> {
        let mut mappings: BTreeMap<EntityKind, BTreeMap<String, String>> = BTreeMap::new();
        for entry in &self.entries {
            if let Some(server_id) = &entry.server_id {
                mappings
                    .entry(entry.kind)
                    .or_default()
                    .insert(entry.client_id.clone(), server_id.clone());
            }
        }
        mappings
    }
}

/// Merge `batch` into `repo`.
///
/// Fails with a validation error on the first record with an empty client id
/// or a parent that is neither stored nor merged earlier in the batch.
/// References to kinds the store cannot hold are not checked.
pub async fn merge_batch<R: RecordRepository>(repo: &R, batch: &EntityBatch) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    for kind in graph::plan(batch) {
        let records = batch.records(kind);
        if !repo.supports(kind) {
            tracing::debug!("Skipping {} {kind} records: unsupported by store", records.len());
            report.skipped.insert(kind, records.len());
            continue;
        }

        for record in records {
            let entry = merge_record(repo, record).await?;
            report.entries.push(entry);
        }

        tracing::debug!(
            "Merged {kind}: {} inserted, {} updated, {} rejected",
            report.inserted(kind),
            report.updated(kind),
            report.rejected(kind)
        );
    }

    Ok(report)
}

async fn merge_record<R: RecordRepository>(repo: &R, record: &SyncRecord) -> Result<MergeEntry> {
    let kind = record.kind();
    let meta = record.meta();

    if meta.client_id.trim().is_empty() {
        return Err(ValidationError::new(kind, "", ValidationReason::EmptyClientId).into());
    }

    for parent in record.parent_refs() {
        if !repo.supports(parent.kind) {
            continue;
        }
        if repo.find(parent.kind, &parent.client_id).await?.is_none() {
            return Err(ValidationError::new(
                kind,
                meta.client_id.clone(),
                ValidationReason::MissingParent {
                    kind: parent.kind,
                    client_id: parent.client_id,
                },
            )
            .into());
        }
    }

    let existing = repo.find(kind, &meta.client_id).await?;
    let (outcome, server_id) = match conflict::resolve(existing.as_ref(), meta) {
        Resolution::Insert => (MergeOutcome::Inserted, repo.insert(record).await?),
        Resolution::Update { server_id } => (
            MergeOutcome::Updated,
            repo.update(record, server_id.as_deref()).await?,
        ),
        Resolution::Reject { server_id } => {
            if let Some(stored) = &existing {
                if conflict::is_stale_write(stored, meta) {
                    repo.record_conflict(kind, stored, meta).await?;
                }
            }
            (MergeOutcome::Rejected, server_id)
        }
    };

    Ok(MergeEntry {
        kind,
        client_id: meta.client_id.clone(),
        outcome,
        server_id,
    })
}
