//! User profile, custom exercises and gamification state

use serde::{Deserialize, Serialize};

use super::record::{sync_meta_accessors, SyncEntity};
use super::{EntityKind, SyncMeta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub meta: SyncMeta,
    #[serde(default)]
    pub display_name: Option<String>,
    /// `kg` or `lb`
    #[serde(default = "default_weight_unit")]
    pub weight_unit: String,
    #[serde(default)]
    pub body_weight_kg: Option<f64>,
}

fn default_weight_unit() -> String {
    "kg".to_string()
}

impl SyncEntity for UserProfile {
    const KIND: EntityKind = EntityKind::UserProfile;
    sync_meta_accessors!();
}

/// An exercise defined by the user rather than the built-in catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomExercise {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub name: String,
    #[serde(default)]
    pub muscle_group: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
}

impl SyncEntity for CustomExercise {
    const KIND: EntityKind = EntityKind::CustomExercise;
    sync_meta_accessors!();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub badge_id: String,
    pub earned_at: i64,
}

impl SyncEntity for EarnedBadge {
    const KIND: EntityKind = EntityKind::EarnedBadge;
    sync_meta_accessors!();
}

/// A closed (or current) run of consecutive training days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakHistory {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub started_on: String,
    #[serde(default)]
    pub ended_on: Option<String>,
    pub length_days: i64,
}

impl SyncEntity for StreakHistory {
    const KIND: EntityKind = EntityKind::StreakHistory;
    sync_meta_accessors!();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationStats {
    #[serde(flatten)]
    pub meta: SyncMeta,
    #[serde(default)]
    pub total_workouts: i64,
    #[serde(default)]
    pub total_volume_kg: f64,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub longest_streak: i64,
    #[serde(default)]
    pub experience_points: i64,
}

impl SyncEntity for GamificationStats {
    const KIND: EntityKind = EntityKind::GamificationStats;
    sync_meta_accessors!();
}
