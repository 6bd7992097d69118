//! Training cycles (multi-week programs)

use serde::{Deserialize, Serialize};

use super::record::{sync_meta_accessors, SyncEntity};
use super::{EntityKind, ParentRef, SyncMeta};

/// A repeating multi-day training program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingCycle {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub started_at: Option<i64>,
}

impl TrainingCycle {
    pub fn new(meta: SyncMeta, name: impl Into<String>) -> Self {
        Self {
            meta,
            name: name.into(),
            description: None,
            is_active: false,
            started_at: None,
        }
    }
}

impl SyncEntity for TrainingCycle {
    const KIND: EntityKind = EntityKind::TrainingCycle;
    sync_meta_accessors!();
}

/// One day of a training cycle, optionally bound to a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDay {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub cycle_id: String,
    pub day_number: i64,
    #[serde(default)]
    pub routine_id: Option<String>,
    #[serde(default)]
    pub is_rest_day: bool,
}

impl CycleDay {
    pub fn new(meta: SyncMeta, cycle_id: impl Into<String>, day_number: i64) -> Self {
        Self {
            meta,
            cycle_id: cycle_id.into(),
            day_number,
            routine_id: None,
            is_rest_day: false,
        }
    }
}

impl SyncEntity for CycleDay {
    const KIND: EntityKind = EntityKind::CycleDay;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        [
            Some(ParentRef::new(EntityKind::TrainingCycle, &self.cycle_id)),
            ParentRef::optional(EntityKind::Routine, self.routine_id.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Where the user currently is inside a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProgress {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub cycle_id: String,
    pub current_day_number: i64,
    #[serde(default)]
    pub last_completed_at: Option<i64>,
    #[serde(default)]
    pub rotation_count: i64,
}

impl SyncEntity for CycleProgress {
    const KIND: EntityKind = EntityKind::CycleProgress;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityKind::TrainingCycle, &self.cycle_id)]
    }
}

/// Load progression rule applied to an exercise across cycle rotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProgression {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub cycle_id: String,
    pub exercise_id: String,
    #[serde(default)]
    pub weight_increment_kg: f64,
    #[serde(default)]
    pub rep_increment: i64,
    /// Apply the increment every N completed rotations
    #[serde(default = "default_frequency")]
    pub frequency: i64,
}

const fn default_frequency() -> i64 {
    1
}

impl SyncEntity for CycleProgression {
    const KIND: EntityKind = EntityKind::CycleProgression;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityKind::TrainingCycle, &self.cycle_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_frequency_defaults_to_every_rotation() {
        let progression: CycleProgression = serde_json::from_value(serde_json::json!({
            "clientId": "G1",
            "updatedAt": 5,
            "cycleId": "T1",
            "exerciseId": "squat",
            "weightIncrementKg": 2.5,
        }))
        .unwrap();

        assert_eq!(progression.frequency, 1);
        assert_eq!(progression.rep_increment, 0);
    }

    #[test]
    fn cycle_day_references_cycle_and_routine() {
        let mut day = CycleDay::new(SyncMeta::new("D1", 1), "T1", 1);
        day.routine_id = Some("R1".to_string());

        assert_eq!(
            day.parent_refs(),
            vec![
                ParentRef::new(EntityKind::TrainingCycle, "T1"),
                ParentRef::new(EntityKind::Routine, "R1"),
            ]
        );
    }
}
