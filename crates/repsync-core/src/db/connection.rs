//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::capabilities::StoreCapabilities;
use super::migrations;

/// Which side of the sync protocol a store belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    /// Local store on a user's device; one user, schema may lag behind
    Device,
    /// Server store shared by all users, always at the latest schema
    Server,
}

/// Database wrapper for libSQL connections
pub struct Database {
    // Keeps the underlying database alive for the connection's lifetime
    _db: LibSqlDatabase,
    conn: Connection,
    role: StoreRole,
}

impl Database {
    /// Open a device database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_device(&path_string(path), migrations::CURRENT_VERSION).await
    }

    /// Open an in-memory device database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_device(":memory:", migrations::CURRENT_VERSION).await
    }

    /// Open a device database migrated only up to `version`.
    ///
    /// Models an install running an older schema, which lacks the kinds
    /// introduced by later migrations.
    pub async fn open_at_version(path: impl AsRef<Path>, version: i32) -> Result<Self> {
        Self::open_device(&path_string(path), version).await
    }

    /// In-memory variant of [`Database::open_at_version`]
    pub async fn open_in_memory_at_version(version: i32) -> Result<Self> {
        Self::open_device(":memory:", version).await
    }

    /// Open the server database at the given path
    pub async fn open_server(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_server_store(&path_string(path)).await
    }

    /// Open an in-memory server database (useful for testing)
    pub async fn open_server_in_memory() -> Result<Self> {
        Self::open_server_store(":memory:").await
    }

    async fn open_device(path: &str, version: i32) -> Result<Self> {
        let database = Self::connect(path, StoreRole::Device).await?;
        migrations::run_to(&database.conn, version).await?;
        Ok(database)
    }

    async fn open_server_store(path: &str) -> Result<Self> {
        let database = Self::connect(path, StoreRole::Server).await?;
        migrations::run_server(&database.conn).await?;
        Ok(database)
    }

    async fn connect(path: &str, role: StoreRole) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let database = Self {
            _db: db,
            conn,
            role,
        };
        database.configure().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA cache_size = 10000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Start a write transaction.
    ///
    /// `IMMEDIATE` takes the write lock up front so two writers never
    /// interleave their reads and writes.
    pub async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err` (or when the commit itself fails).
    pub async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(error) = self.conn.execute("COMMIT", ()).await {
                    self.rollback().await;
                    return Err(error.into());
                }
                Ok(value)
            }
            Err(error) => {
                self.rollback().await;
                Err(error)
            }
        }
    }

    async fn rollback(&self) {
        if let Err(error) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback failed: {error}");
        }
    }

    /// Entity kinds this store has tables for
    pub async fn capabilities(&self) -> Result<StoreCapabilities> {
        match self.role {
            StoreRole::Server => Ok(StoreCapabilities::all()),
            StoreRole::Device => StoreCapabilities::detect(&self.conn).await,
        }
    }

    /// Current schema version
    pub async fn schema_version(&self) -> Result<i32> {
        migrations::get_version(&self.conn).await
    }

    pub const fn role(&self) -> StoreRole {
        self.role
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn path_string(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.role(), StoreRole::Device);
        assert_eq!(
            db.schema_version().await.unwrap(),
            migrations::CURRENT_VERSION
        );
        assert!(db.capabilities().await.unwrap().missing().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_older_schema_reports_missing_kinds() {
        let db = Database::open_in_memory_at_version(1).await.unwrap();
        let capabilities = db.capabilities().await.unwrap();

        assert!(capabilities.supports(EntityKind::Routine));
        assert!(!capabilities.supports(EntityKind::Superset));
        assert!(!capabilities.supports(EntityKind::GamificationStats));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reopen_upgrades_file_database() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("device.db");

        {
            let db = Database::open_at_version(&path, 1).await.unwrap();
            assert_eq!(db.schema_version().await.unwrap(), 1);
        }

        let db = Database::open(&path).await.unwrap();
        assert_eq!(
            db.schema_version().await.unwrap(),
            migrations::CURRENT_VERSION
        );
        assert!(db.capabilities().await.unwrap().supports(EntityKind::Superset));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_finish_rolls_back_on_error() {
        let db = Database::open_in_memory().await.unwrap();

        db.begin().await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO sync_state (key, value) VALUES ('probe', '1')",
                (),
            )
            .await
            .unwrap();
        let result: Result<()> = db
            .finish(Err(crate::error::Error::InvalidInput("boom".into())))
            .await;
        assert!(result.is_err());

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM sync_state", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }
}
