//! Client-side sync: transport, one-cycle client, trigger orchestration.

mod client;
mod orchestrator;
mod state;
mod transport;

pub use client::{SyncClient, SyncSummary};
pub use orchestrator::{
    OrchestratorSettings, SkipReason, SyncOrchestrator, SyncOutcome, Trigger,
};
pub use state::{SyncPhase, SyncState};
pub use transport::{
    HttpSyncTransport, InProcessTransport, SyncCredentials, SyncTransport, SyncTransportError,
    SyncTransportResult, AUTHENTICATED_USER_HEADER,
};
