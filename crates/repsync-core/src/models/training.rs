//! Routines, workout sessions and their sets

use serde::{Deserialize, Serialize};

use super::record::{sync_meta_accessors, SyncEntity};
use super::{EntityKind, ParentRef, SyncMeta};

/// A reusable workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl Routine {
    pub fn new(meta: SyncMeta, name: impl Into<String>) -> Self {
        Self {
            meta,
            name: name.into(),
            description: None,
            sort_order: 0,
        }
    }
}

impl SyncEntity for Routine {
    const KIND: EntityKind = EntityKind::Routine;
    sync_meta_accessors!();
}

/// A group of routine exercises performed back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Superset {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub routine_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub rest_between_secs: Option<i64>,
}

impl Superset {
    pub fn new(meta: SyncMeta, routine_id: impl Into<String>, order_index: i64) -> Self {
        Self {
            meta,
            routine_id: routine_id.into(),
            name: None,
            order_index,
            rest_between_secs: None,
        }
    }
}

impl SyncEntity for Superset {
    const KIND: EntityKind = EntityKind::Superset;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(EntityKind::Routine, &self.routine_id)]
    }
}

/// An exercise slot inside a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub routine_id: String,
    #[serde(default)]
    pub superset_id: Option<String>,
    pub exercise_id: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub rest_secs: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RoutineExercise {
    pub fn new(
        meta: SyncMeta,
        routine_id: impl Into<String>,
        exercise_id: impl Into<String>,
        order_index: i64,
    ) -> Self {
        Self {
            meta,
            routine_id: routine_id.into(),
            superset_id: None,
            exercise_id: exercise_id.into(),
            order_index,
            rest_secs: None,
            notes: None,
        }
    }
}

impl SyncEntity for RoutineExercise {
    const KIND: EntityKind = EntityKind::RoutineExercise;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        [
            Some(ParentRef::new(EntityKind::Routine, &self.routine_id)),
            ParentRef::optional(EntityKind::Superset, self.superset_id.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A target set prescribed for a routine exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSet {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub routine_exercise_id: String,
    pub set_number: i64,
    #[serde(default)]
    pub target_reps: Option<i64>,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    #[serde(default)]
    pub set_type: Option<String>,
}

impl PlannedSet {
    pub fn new(meta: SyncMeta, routine_exercise_id: impl Into<String>, set_number: i64) -> Self {
        Self {
            meta,
            routine_exercise_id: routine_exercise_id.into(),
            set_number,
            target_reps: None,
            target_weight_kg: None,
            set_type: None,
        }
    }
}

impl SyncEntity for PlannedSet {
    const KIND: EntityKind = EntityKind::PlannedSet;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        vec![ParentRef::new(
            EntityKind::RoutineExercise,
            &self.routine_exercise_id,
        )]
    }
}

/// One performed workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    #[serde(flatten)]
    pub meta: SyncMeta,
    #[serde(default)]
    pub routine_id: Option<String>,
    pub started_at: i64,
    #[serde(default)]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub total_volume_kg: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WorkoutSession {
    pub const fn new(meta: SyncMeta, started_at: i64) -> Self {
        Self {
            meta,
            routine_id: None,
            started_at,
            ended_at: None,
            total_volume_kg: None,
            notes: None,
        }
    }
}

impl SyncEntity for WorkoutSession {
    const KIND: EntityKind = EntityKind::WorkoutSession;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        ParentRef::optional(EntityKind::Routine, self.routine_id.as_deref())
            .into_iter()
            .collect()
    }
}

/// A set actually performed during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSet {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub session_id: String,
    #[serde(default)]
    pub planned_set_id: Option<String>,
    pub exercise_id: String,
    pub set_number: i64,
    #[serde(default)]
    pub reps: Option<i64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl CompletedSet {
    pub fn new(
        meta: SyncMeta,
        session_id: impl Into<String>,
        exercise_id: impl Into<String>,
        set_number: i64,
    ) -> Self {
        Self {
            meta,
            session_id: session_id.into(),
            planned_set_id: None,
            exercise_id: exercise_id.into(),
            set_number,
            reps: None,
            weight_kg: None,
            completed_at: None,
        }
    }
}

impl SyncEntity for CompletedSet {
    const KIND: EntityKind = EntityKind::CompletedSet;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        [
            Some(ParentRef::new(EntityKind::WorkoutSession, &self.session_id)),
            ParentRef::optional(EntityKind::PlannedSet, self.planned_set_id.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Best result achieved for an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub exercise_id: String,
    /// e.g. `max_weight`, `max_volume`, `max_reps`
    pub record_type: String,
    pub value: f64,
    #[serde(default)]
    pub reps: Option<i64>,
    pub achieved_at: i64,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PersonalRecord {
    pub fn new(
        meta: SyncMeta,
        exercise_id: impl Into<String>,
        record_type: impl Into<String>,
        value: f64,
        achieved_at: i64,
    ) -> Self {
        Self {
            meta,
            exercise_id: exercise_id.into(),
            record_type: record_type.into(),
            value,
            reps: None,
            achieved_at,
            session_id: None,
        }
    }
}

impl SyncEntity for PersonalRecord {
    const KIND: EntityKind = EntityKind::PersonalRecord;
    sync_meta_accessors!();

    fn parent_refs(&self) -> Vec<ParentRef> {
        ParentRef::optional(EntityKind::WorkoutSession, self.session_id.as_deref())
            .into_iter()
            .collect()
    }
}
