//! Record repository implementation
//!
//! Every kind shares one table shape: sync metadata in columns, the full
//! record as a JSON payload. Metadata columns are authoritative; payload
//! copies are overwritten on read.

use libsql::{params, Connection, Value};

use super::capabilities::StoreCapabilities;
use crate::error::{Error, Result};
use crate::models::{new_server_id, EntityKind, StoredMeta, SyncConflict, SyncMeta, SyncRecord};
use crate::util::now_millis;

const CONFLICT_STRATEGY: &str = "last_write_wins";

/// Whose rows a repository reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// The single user of a device store
    Device,
    /// One user's partition of the server store
    User(String),
}

/// Where device-store writes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Edits made on this device, queued for the next push
    Local,
    /// Records received from the server
    Remote,
}

/// Trait for record storage operations (async)
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
    /// Whether this store has a table for `kind`
    fn supports(&self, kind: EntityKind) -> bool;

    /// Metadata of the stored row with this client id
    async fn find(&self, kind: EntityKind, client_id: &str) -> Result<Option<StoredMeta>>;

    /// Persist a new record, returning the server id it was stored with
    async fn insert(&self, record: &SyncRecord) -> Result<Option<String>>;

    /// Replace a stored record, returning the server id it was stored with
    async fn update(&self, record: &SyncRecord, stored_server_id: Option<&str>)
        -> Result<Option<String>>;

    /// Record a rejected stale write
    async fn record_conflict(
        &self,
        kind: EntityKind,
        existing: &StoredMeta,
        incoming: &SyncMeta,
    ) -> Result<()>;
}

/// libSQL implementation of `RecordRepository`
pub struct LibSqlRecordRepository<'a> {
    conn: &'a Connection,
    owner: Owner,
    capabilities: StoreCapabilities,
    origin: WriteOrigin,
}

impl<'a> LibSqlRecordRepository<'a> {
    /// Repository over a device store with the given capabilities
    pub const fn device(conn: &'a Connection, capabilities: StoreCapabilities) -> Self {
        Self {
            conn,
            owner: Owner::Device,
            capabilities,
            origin: WriteOrigin::Local,
        }
    }

    /// Same store, but writes are marked as already known to the server.
    #[must_use]
    pub fn remote(mut self) -> Self {
        self.origin = WriteOrigin::Remote;
        self
    }

    /// Repository over one user's partition of the server store
    pub fn user(conn: &'a Connection, user_id: impl Into<String>) -> Self {
        Self {
            conn,
            owner: Owner::User(user_id.into()),
            capabilities: StoreCapabilities::all(),
            origin: WriteOrigin::Remote,
        }
    }

    pub const fn capabilities(&self) -> &StoreCapabilities {
        &self.capabilities
    }

    const fn pending_flag(&self) -> i64 {
        match self.origin {
            WriteOrigin::Local => 1,
            WriteOrigin::Remote => 0,
        }
    }

    /// Every row of `kind`, tombstones included, in insertion order
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<SyncRecord>> {
        if !self.supports(kind) {
            return Ok(Vec::new());
        }

        let table = kind.table_name();
        let rows = match &self.owner {
            Owner::Device => {
                let sql = format!(
                    "SELECT server_id, device_id, updated_at, deleted_at, payload
                     FROM {table} ORDER BY rowid"
                );
                self.conn.query(&sql, ()).await?
            }
            Owner::User(user_id) => {
                let sql = format!(
                    "SELECT server_id, device_id, updated_at, deleted_at, payload
                     FROM {table} WHERE user_id = ?1 ORDER BY rowid"
                );
                self.conn.query(&sql, [user_id.as_str()]).await?
            }
        };

        collect_records(kind, rows).await
    }

    /// Rows of `kind` whose clock is strictly after `since`.
    ///
    /// With a `tombstone_horizon`, tombstones deleted before it are left out.
    pub async fn list_changed_since(
        &self,
        kind: EntityKind,
        since: i64,
        tombstone_horizon: Option<i64>,
    ) -> Result<Vec<SyncRecord>> {
        if !self.supports(kind) {
            return Ok(Vec::new());
        }

        let table = kind.table_name();
        let horizon = tombstone_horizon.map_or(Value::Null, Value::Integer);
        let rows = match &self.owner {
            Owner::Device => {
                let sql = format!(
                    "SELECT server_id, device_id, updated_at, deleted_at, payload
                     FROM {table}
                     WHERE updated_at > ?1
                       AND (?2 IS NULL OR deleted_at IS NULL OR deleted_at >= ?2)
                     ORDER BY updated_at, rowid"
                );
                self.conn.query(&sql, params![since, horizon]).await?
            }
            Owner::User(user_id) => {
                let sql = format!(
                    "SELECT server_id, device_id, updated_at, deleted_at, payload
                     FROM {table}
                     WHERE user_id = ?1 AND updated_at > ?2
                       AND (?3 IS NULL OR deleted_at IS NULL OR deleted_at >= ?3)
                     ORDER BY updated_at, rowid"
                );
                self.conn
                    .query(&sql, params![user_id.as_str(), since, horizon])
                    .await?
            }
        };

        collect_records(kind, rows).await
    }

    /// Number of rows of `kind` changed after `since`
    pub async fn count_changed_since(&self, kind: EntityKind, since: i64) -> Result<u64> {
        if !self.supports(kind) {
            return Ok(0);
        }

        let table = kind.table_name();
        let mut rows = match &self.owner {
            Owner::Device => {
                let sql = format!("SELECT COUNT(*) FROM {table} WHERE updated_at > ?1");
                self.conn.query(&sql, [since]).await?
            }
            Owner::User(user_id) => {
                let sql =
                    format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?1 AND updated_at > ?2");
                self.conn
                    .query(&sql, params![user_id.as_str(), since])
                    .await?
            }
        };

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Device rows written locally and not yet acknowledged by a push.
    pub async fn list_pending(&self, kind: EntityKind) -> Result<Vec<SyncRecord>> {
        if !self.supports(kind) {
            return Ok(Vec::new());
        }
        let Owner::Device = self.owner else {
            return Err(Error::InvalidInput(
                "pending changes only exist on device stores".to_string(),
            ));
        };

        let table = kind.table_name();
        let sql = format!(
            "SELECT server_id, device_id, updated_at, deleted_at, payload
             FROM {table}
             WHERE pending = 1
             ORDER BY updated_at, rowid"
        );
        let rows = self.conn.query(&sql, ()).await?;

        collect_records(kind, rows).await
    }

    /// Clear the pending mark of a pushed row, unless it was edited again
    /// after the push was built.
    ///
    /// Returns whether a row was changed.
    pub async fn acknowledge(
        &self,
        kind: EntityKind,
        client_id: &str,
        pushed_updated_at: i64,
    ) -> Result<bool> {
        if !self.supports(kind) {
            return Ok(false);
        }

        let table = kind.table_name();
        let sql = format!(
            "UPDATE {table} SET pending = 0
             WHERE client_id = ?1 AND updated_at = ?2 AND pending = 1"
        );
        let changed = self
            .conn
            .execute(&sql, params![client_id, pushed_updated_at])
            .await?;
        Ok(changed > 0)
    }

    /// Attach a server id to a device row that has none yet.
    ///
    /// Returns whether a row was changed.
    pub async fn assign_server_id(
        &self,
        kind: EntityKind,
        client_id: &str,
        server_id: &str,
    ) -> Result<bool> {
        if !self.supports(kind) {
            return Ok(false);
        }

        let table = kind.table_name();
        let sql = format!(
            "UPDATE {table} SET server_id = ?2
             WHERE client_id = ?1 AND (server_id IS NULL OR server_id != ?2)"
        );
        let changed = self
            .conn
            .execute(&sql, params![client_id, server_id])
            .await?;
        Ok(changed > 0)
    }

    /// Most recent conflicts first
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = match &self.owner {
            Owner::Device => {
                self.conn
                    .query(
                        "SELECT id, kind, client_id, local_updated_at, incoming_updated_at,
                                incoming_device_id, resolved_at, strategy
                         FROM sync_conflicts ORDER BY resolved_at DESC, id DESC LIMIT ?1",
                        [limit],
                    )
                    .await?
            }
            Owner::User(user_id) => {
                self.conn
                    .query(
                        "SELECT id, kind, client_id, local_updated_at, incoming_updated_at,
                                incoming_device_id, resolved_at, strategy
                         FROM sync_conflicts WHERE user_id = ?1
                         ORDER BY resolved_at DESC, id DESC LIMIT ?2",
                        params![user_id.as_str(), limit],
                    )
                    .await?
            }
        };

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            let kind: String = row.get(1)?;
            let kind = EntityKind::from_wire_name(&kind)
                .ok_or_else(|| Error::Database(format!("Unknown conflict kind '{kind}'")))?;
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                kind,
                client_id: row.get(2)?,
                local_updated_at: row.get(3)?,
                incoming_updated_at: row.get(4)?,
                incoming_device_id: row.get(5)?,
                resolved_at: row.get(6)?,
                strategy: row.get(7)?,
            });
        }
        Ok(conflicts)
    }
}

impl RecordRepository for LibSqlRecordRepository<'_> {
    fn supports(&self, kind: EntityKind) -> bool {
        self.capabilities.supports(kind)
    }

    async fn find(&self, kind: EntityKind, client_id: &str) -> Result<Option<StoredMeta>> {
        if !self.supports(kind) {
            return Ok(None);
        }

        let table = kind.table_name();
        let mut rows = match &self.owner {
            Owner::Device => {
                let sql = format!(
                    "SELECT server_id, updated_at, deleted_at FROM {table} WHERE client_id = ?1"
                );
                self.conn.query(&sql, [client_id]).await?
            }
            Owner::User(user_id) => {
                let sql = format!(
                    "SELECT server_id, updated_at, deleted_at FROM {table}
                     WHERE user_id = ?1 AND client_id = ?2"
                );
                self.conn
                    .query(&sql, params![user_id.as_str(), client_id])
                    .await?
            }
        };

        match rows.next().await? {
            Some(row) => Ok(Some(StoredMeta {
                server_id: row.get(0)?,
                updated_at: row.get(1)?,
                deleted_at: row.get(2)?,
            })),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: &SyncRecord) -> Result<Option<String>> {
        let table = record.kind().table_name();
        let meta = record.meta();
        let payload = serde_json::to_string(record)?;

        match &self.owner {
            Owner::Device => {
                let server_id = meta.server_id.clone();
                let sql = format!(
                    "INSERT INTO {table}
                        (client_id, server_id, device_id, updated_at, deleted_at, payload, pending)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                );
                self.conn
                    .execute(
                        &sql,
                        params![
                            meta.client_id.as_str(),
                            optional_text(server_id.as_deref()),
                            optional_text(meta.device_id.as_deref()),
                            meta.updated_at,
                            optional_integer(meta.deleted_at),
                            payload,
                            self.pending_flag()
                        ],
                    )
                    .await?;
                Ok(server_id)
            }
            Owner::User(user_id) => {
                let server_id = new_server_id();
                let sql = format!(
                    "INSERT INTO {table}
                        (user_id, client_id, server_id, device_id, updated_at, deleted_at, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                );
                self.conn
                    .execute(
                        &sql,
                        params![
                            user_id.as_str(),
                            meta.client_id.as_str(),
                            server_id.as_str(),
                            optional_text(meta.device_id.as_deref()),
                            meta.updated_at,
                            optional_integer(meta.deleted_at),
                            payload
                        ],
                    )
                    .await?;
                Ok(Some(server_id))
            }
        }
    }

    async fn update(
        &self,
        record: &SyncRecord,
        stored_server_id: Option<&str>,
    ) -> Result<Option<String>> {
        let table = record.kind().table_name();
        let meta = record.meta();
        let payload = serde_json::to_string(record)?;

        match &self.owner {
            Owner::Device => {
                // A device learns server ids; it never forgets one it already has
                let server_id = meta
                    .server_id
                    .as_deref()
                    .or(stored_server_id)
                    .map(str::to_string);
                let sql = format!(
                    "UPDATE {table}
                     SET server_id = ?2, device_id = ?3, updated_at = ?4, deleted_at = ?5,
                         payload = ?6, pending = ?7
                     WHERE client_id = ?1"
                );
                self.conn
                    .execute(
                        &sql,
                        params![
                            meta.client_id.as_str(),
                            optional_text(server_id.as_deref()),
                            optional_text(meta.device_id.as_deref()),
                            meta.updated_at,
                            optional_integer(meta.deleted_at),
                            payload,
                            self.pending_flag()
                        ],
                    )
                    .await?;
                Ok(server_id)
            }
            Owner::User(user_id) => {
                // Server ids are assigned once and never reassigned
                let sql = format!(
                    "UPDATE {table}
                     SET device_id = ?3, updated_at = ?4, deleted_at = ?5, payload = ?6
                     WHERE user_id = ?1 AND client_id = ?2"
                );
                self.conn
                    .execute(
                        &sql,
                        params![
                            user_id.as_str(),
                            meta.client_id.as_str(),
                            optional_text(meta.device_id.as_deref()),
                            meta.updated_at,
                            optional_integer(meta.deleted_at),
                            payload
                        ],
                    )
                    .await?;
                Ok(stored_server_id.map(str::to_string))
            }
        }
    }

    async fn record_conflict(
        &self,
        kind: EntityKind,
        existing: &StoredMeta,
        incoming: &SyncMeta,
    ) -> Result<()> {
        let device = optional_text(incoming.device_id.as_deref());
        let resolved_at = now_millis();

        match &self.owner {
            Owner::Device => {
                self.conn
                    .execute(
                        "INSERT INTO sync_conflicts
                            (kind, client_id, local_updated_at, incoming_updated_at,
                             incoming_device_id, resolved_at, strategy)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            kind.wire_name(),
                            incoming.client_id.as_str(),
                            existing.updated_at,
                            incoming.updated_at,
                            device,
                            resolved_at,
                            CONFLICT_STRATEGY
                        ],
                    )
                    .await?;
            }
            Owner::User(user_id) => {
                self.conn
                    .execute(
                        "INSERT INTO sync_conflicts
                            (user_id, kind, client_id, local_updated_at, incoming_updated_at,
                             incoming_device_id, resolved_at, strategy)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            user_id.as_str(),
                            kind.wire_name(),
                            incoming.client_id.as_str(),
                            existing.updated_at,
                            incoming.updated_at,
                            device,
                            resolved_at,
                            CONFLICT_STRATEGY
                        ],
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.to_string()))
}

fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

/// Decode rows of `(server_id, device_id, updated_at, deleted_at, payload)`.
async fn collect_records(kind: EntityKind, mut rows: libsql::Rows) -> Result<Vec<SyncRecord>> {
    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        let payload: String = row.get(4)?;
        let mut record = SyncRecord::from_value(kind, serde_json::from_str(&payload)?)?;

        let meta = record.meta_mut();
        meta.server_id = row.get(0)?;
        meta.device_id = row.get(1)?;
        meta.updated_at = row.get(2)?;
        meta.deleted_at = row.get(3)?;

        records.push(record);
    }
    Ok(records)
}
