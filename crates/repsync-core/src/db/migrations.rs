//! Database migrations
//!
//! Device stores grow one migration at a time, so an older install can lack
//! whole entity kinds; server stores are always created at the latest schema.

use crate::error::Result;
use crate::models::EntityKind;
use libsql::Connection;

/// Current device schema version
pub const CURRENT_VERSION: i32 = 3;

/// Current server schema version
pub const SERVER_VERSION: i32 = 1;

/// Kinds introduced by each device schema version.
const V1_KINDS: &[EntityKind] = &[
    EntityKind::UserProfile,
    EntityKind::CustomExercise,
    EntityKind::Routine,
    EntityKind::RoutineExercise,
    EntityKind::PlannedSet,
    EntityKind::WorkoutSession,
    EntityKind::CompletedSet,
    EntityKind::PersonalRecord,
];
const V2_KINDS: &[EntityKind] = &[
    EntityKind::Superset,
    EntityKind::TrainingCycle,
    EntityKind::CycleDay,
    EntityKind::CycleProgress,
    EntityKind::CycleProgression,
];
const V3_KINDS: &[EntityKind] = &[
    EntityKind::EarnedBadge,
    EntityKind::StreakHistory,
    EntityKind::GamificationStats,
];

/// Run all pending device migrations
pub async fn run(conn: &Connection) -> Result<()> {
    run_to(conn, CURRENT_VERSION).await
}

/// Run device migrations up to (and including) `target`
pub async fn run_to(conn: &Connection, target: i32) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 && target >= 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 && target >= 2 {
        migrate_v2(conn).await?;
    }
    if version < 3 && target >= 3 {
        migrate_v3(conn).await?;
    }

    Ok(())
}

/// Run server migrations
pub async fn run_server(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;
    if version < 1 {
        migrate_server_v1(conn).await?;
    }
    Ok(())
}

/// Get the current schema version
pub async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Table and index DDL for a device-side entity table.
///
/// `pending` marks local writes the server has not acknowledged yet.
fn device_table(kind: EntityKind) -> [String; 3] {
    let table = kind.table_name();
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                client_id TEXT PRIMARY KEY,
                server_id TEXT,
                device_id TEXT,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                payload TEXT NOT NULL,
                pending INTEGER NOT NULL DEFAULT 0
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_updated ON {table}(updated_at)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_pending ON {table}(pending)"),
    ]
}

/// Table and index DDL for a server-side entity table, owned per user.
fn server_table(kind: EntityKind) -> [String; 2] {
    let table = kind.table_name();
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                user_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                server_id TEXT NOT NULL UNIQUE,
                device_id TEXT,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                payload TEXT NOT NULL,
                PRIMARY KEY (user_id, client_id)
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_user_updated ON {table}(user_id, updated_at)"
        ),
    ]
}

/// Execute `statements` plus the version bump in one transaction.
async fn apply(conn: &Connection, version: i32, statements: Vec<String>) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(&stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: core training tables, sync bookkeeping
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let mut statements = vec![
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
        // Sync state (local only)
        "CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )"
        .to_string(),
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            client_id TEXT NOT NULL,
            local_updated_at INTEGER NOT NULL,
            incoming_updated_at INTEGER NOT NULL,
            incoming_device_id TEXT,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        )"
        .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)"
            .to_string(),
    ];
    statements.extend(V1_KINDS.iter().copied().flat_map(device_table));
    apply(conn, 1, statements).await
}

/// Migration to version 2: supersets and training cycles
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = V2_KINDS.iter().copied().flat_map(device_table).collect();
    apply(conn, 2, statements).await
}

/// Migration to version 3: gamification
async fn migrate_v3(conn: &Connection) -> Result<()> {
    let statements = V3_KINDS.iter().copied().flat_map(device_table).collect();
    apply(conn, 3, statements).await
}

/// Server migration to version 1: every kind, device registry, conflict log
async fn migrate_server_v1(conn: &Connection) -> Result<()> {
    let mut statements = vec![
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
        "CREATE TABLE IF NOT EXISTS devices (
            user_id TEXT NOT NULL,
            device_id TEXT NOT NULL,
            device_name TEXT,
            platform TEXT,
            first_seen_at INTEGER NOT NULL,
            last_seen_at INTEGER NOT NULL,
            last_sync_at INTEGER,
            PRIMARY KEY (user_id, device_id)
        )"
        .to_string(),
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            client_id TEXT NOT NULL,
            local_updated_at INTEGER NOT NULL,
            incoming_updated_at INTEGER NOT NULL,
            incoming_device_id TEXT,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        )"
        .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_user ON sync_conflicts(user_id, resolved_at DESC)"
            .to_string(),
    ];
    statements.extend(EntityKind::ALL.into_iter().flat_map(server_table));
    apply(conn, SERVER_VERSION, statements).await
}
