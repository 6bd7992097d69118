//! Push/pull/status wire payloads
//!
//! Record arrays sit at the top level of push requests and pull responses,
//! keyed by kind wire name, next to the envelope fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{EntityBatch, EntityKind};

/// `clientId -> serverId` per kind.
pub type IdMappings = BTreeMap<EntityKind, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub last_sync: Option<i64>,
    #[serde(flatten)]
    pub batch: EntityBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub sync_time: i64,
    #[serde(default)]
    pub id_mappings: IdMappings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub device_id: String,
    #[serde(default)]
    pub last_sync: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub sync_time: i64,
    #[serde(flatten)]
    pub batch: EntityBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub last_sync_time: Option<i64>,
    pub pending_changes: u64,
    pub authenticated: bool,
    #[serde(default)]
    pub subscription: Option<String>,
}
