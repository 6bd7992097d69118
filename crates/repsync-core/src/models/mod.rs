//! Data models for repsync

mod batch;
mod cycle;
mod kind;
mod meta;
mod profile;
mod record;
mod sync_conflict;
mod training;

pub use batch::EntityBatch;
pub use cycle::{CycleDay, CycleProgress, CycleProgression, TrainingCycle};
pub use kind::EntityKind;
pub use meta::{new_server_id, ParentRef, StoredMeta, SyncMeta};
pub use profile::{CustomExercise, EarnedBadge, GamificationStats, StreakHistory, UserProfile};
pub use record::{SyncEntity, SyncRecord};
pub use sync_conflict::SyncConflict;
pub use training::{
    CompletedSet, PersonalRecord, PlannedSet, Routine, RoutineExercise, Superset, WorkoutSession,
};
