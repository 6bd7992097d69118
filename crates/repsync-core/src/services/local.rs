//! Device-side store service used by clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlRecordRepository, LibSqlSyncStateRepository, StoreCapabilities, StoreRole,
    SyncStateRepository,
};
use crate::error::{Error, Result};
use crate::graph;
use crate::merge::{merge_batch, MergeOutcome, MergeReport};
use crate::models::{EntityBatch, EntityKind, SyncConflict, SyncRecord};
use crate::protocol::IdMappings;
use crate::snapshot::{self, ImportReport, SnapshotDocument};
use crate::sync::SyncState;

/// Thread-safe service over the device store.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a device store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory device store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory().await?)
    }

    pub fn from_database(db: Database) -> Result<Self> {
        if db.role() != StoreRole::Device {
            return Err(Error::InvalidInput(
                "local store requires a device database".to_string(),
            ));
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub async fn capabilities(&self) -> Result<StoreCapabilities> {
        let db = self.db.lock().await;
        db.capabilities().await
    }

    pub async fn schema_version(&self) -> Result<i32> {
        let db = self.db.lock().await;
        db.schema_version().await
    }

    /// Write one local record through the merge rules.
    ///
    /// The record must carry a newer clock than any stored copy, and its
    /// parents must already exist.
    pub async fn save(&self, record: impl Into<SyncRecord>) -> Result<MergeOutcome> {
        let record = record.into();
        let kind = record.kind();
        let batch = EntityBatch::new().with(record);

        let report = self.merge(&batch).await?;
        match report.entries().first() {
            Some(entry) => Ok(entry.outcome),
            None => Err(Error::InvalidInput(format!(
                "{kind} records are not supported by this store"
            ))),
        }
    }

    /// Every stored record of `kind`, tombstones included.
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<SyncRecord>> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?;
        repo.list(kind).await
    }

    /// Local writes the server has not acknowledged yet.
    pub async fn pending_changes(&self) -> Result<EntityBatch> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?;

        let mut batch = EntityBatch::new();
        for kind in graph::merge_order() {
            batch.set(kind, repo.list_pending(kind).await?);
        }
        Ok(batch)
    }

    /// Record the outcome of a push of `pushed`: attach the returned server
    /// ids and clear the pending mark of every mapped row still at the pushed
    /// clock. Returns how many rows learned a server id.
    pub async fn acknowledge_push(
        &self,
        pushed: &EntityBatch,
        mappings: &IdMappings,
    ) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?;

        db.begin().await?;
        let result = async {
            let mut mapped = 0;
            for record in pushed.iter() {
                let kind = record.kind();
                let Some(server_id) = mappings
                    .get(&kind)
                    .and_then(|ids| ids.get(record.client_id()))
                else {
                    continue;
                };
                if repo
                    .assign_server_id(kind, record.client_id(), server_id)
                    .await?
                {
                    mapped += 1;
                }
                repo.acknowledge(kind, record.client_id(), record.updated_at())
                    .await?;
            }
            Ok::<_, Error>(mapped)
        }
        .await;
        db.finish(result).await
    }

    /// Merge records pulled from the server.
    ///
    /// Server ids on pulled records are adopted even when the local copy wins.
    /// Rows replaced by a pulled record are not queued for push.
    pub async fn apply_remote(&self, batch: &EntityBatch) -> Result<MergeReport> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?.remote();

        db.begin().await?;
        let result = async {
            let report = merge_batch(&repo, batch).await?;
            for record in batch.iter() {
                if let Some(server_id) = record.server_id() {
                    repo.assign_server_id(record.kind(), record.client_id(), server_id)
                        .await?;
                }
            }
            Ok::<_, Error>(report)
        }
        .await;
        db.finish(result).await
    }

    /// Merge a batch of local records in one transaction.
    pub async fn merge(&self, batch: &EntityBatch) -> Result<MergeReport> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?;

        db.begin().await?;
        let result = merge_batch(&repo, batch).await;
        db.finish(result).await
    }

    pub async fn export_snapshot(&self, app_version: Option<&str>) -> Result<SnapshotDocument> {
        let db = self.db.lock().await;
        snapshot::export(&db, app_version).await
    }

    pub async fn import_snapshot(&self, document: &SnapshotDocument) -> Result<ImportReport> {
        let db = self.db.lock().await;
        snapshot::import(&db, document).await
    }

    pub async fn load_sync_state(&self) -> Result<SyncState> {
        let db = self.db.lock().await;
        LibSqlSyncStateRepository::new(db.connection()).load().await
    }

    pub async fn save_sync_state(&self, state: &SyncState) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSyncStateRepository::new(db.connection())
            .save(state)
            .await
    }

    /// This device's identifier, generated on first use
    pub async fn device_id(&self) -> Result<String> {
        let db = self.db.lock().await;
        LibSqlSyncStateRepository::new(db.connection())
            .device_id()
            .await
    }

    /// List recently resolved sync conflicts.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().await;
        let repo = Self::records(&db).await?;
        repo.list_conflicts(limit).await
    }

    async fn records(db: &Database) -> Result<LibSqlRecordRepository<'_>> {
        let capabilities = db.capabilities().await?;
        Ok(LibSqlRecordRepository::device(db.connection(), capabilities))
    }
}
