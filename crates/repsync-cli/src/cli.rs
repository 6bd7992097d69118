use std::path::PathBuf;

use clap::{Parser, Subcommand};
use repsync_core::EntityKind;

#[derive(Parser)]
#[command(name = "repsync")]
#[command(about = "Back up, restore and sync a local training log")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a full snapshot of the local store
    Export {
        /// Output file, or a directory to receive a timestamped file (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// App version recorded in the snapshot
        #[arg(long, value_name = "VERSION")]
        app_version: Option<String>,
    },
    /// Restore a snapshot into the local store
    Import {
        /// Snapshot file to read
        #[arg(value_name = "PATH")]
        input: PathBuf,
        /// Output the import report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List local records of one kind
    List {
        /// Kind wire name, e.g. `routines` or `personalRecords`
        kind: EntityKind,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync cycle against the configured API
    Sync {
        /// Treat this as a periodic check (subject to the foreground throttle)
        #[arg(long)]
        foreground: bool,
        /// Device name reported to the server
        #[arg(long, value_name = "NAME")]
        device_name: Option<String>,
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Show local store and sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show stale writes rejected during merges
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
