//! Store services shared by the API server and clients.

mod change_feed;
mod ingest;
mod local;
mod sync_service;

pub use local::LocalStore;
pub use sync_service::{SyncService, SyncServiceOptions, DEFAULT_MAX_PUSH_RECORDS};
