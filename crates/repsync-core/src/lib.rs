//! repsync-core - Core library for repsync
//!
//! This crate contains the entity model, the merge engine with its
//! dependency graph and conflict resolver, the libSQL stores, snapshot
//! export/import and client-side sync orchestration used by the API server
//! and the CLI.

pub mod config;
pub mod conflict;
pub mod db;
pub mod error;
pub mod graph;
pub mod merge;
pub mod models;
pub mod protocol;
pub mod services;
pub mod snapshot;
pub mod sync;
pub mod util;

pub use error::{Error, Result, ValidationError, ValidationReason};
pub use models::{EntityBatch, EntityKind, SyncMeta, SyncRecord};
pub use protocol::{
    IdMappings, PullRequest, PullResponse, PushRequest, PushResponse, StatusResponse,
};
