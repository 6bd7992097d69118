//! Database layer for repsync

mod capabilities;
mod connection;
mod device_repository;
mod migrations;
mod records;
mod sync_state_repository;

pub use capabilities::StoreCapabilities;
pub use connection::{Database, StoreRole};
pub use device_repository::{DeviceRecord, DeviceRegistration, LibSqlDeviceRepository};
pub use migrations::{CURRENT_VERSION, SERVER_VERSION};
pub use records::{LibSqlRecordRepository, Owner, RecordRepository, WriteOrigin};
pub use sync_state_repository::{LibSqlSyncStateRepository, SyncStateRepository};
