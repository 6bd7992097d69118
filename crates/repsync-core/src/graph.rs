//! Dependency graph over entity kinds
//!
//! A static table of direct prerequisites drives the merge order of both the
//! push ingestion path and the snapshot importer. Batches are merged kind by
//! kind, never record by record across kinds.

use std::collections::BTreeSet;

use crate::models::{EntityBatch, EntityKind};

/// Kinds a record of `kind` may reference directly.
pub const fn direct_prerequisites(kind: EntityKind) -> &'static [EntityKind] {
    use EntityKind::{
        CompletedSet, CycleDay, CycleProgress, CycleProgression, PersonalRecord, PlannedSet,
        Routine, RoutineExercise, Superset, TrainingCycle, WorkoutSession,
    };

    match kind {
        Superset => &[Routine],
        RoutineExercise => &[Routine, Superset],
        PlannedSet => &[RoutineExercise],
        WorkoutSession => &[Routine],
        CompletedSet => &[WorkoutSession, PlannedSet],
        PersonalRecord => &[WorkoutSession],
        CycleDay => &[TrainingCycle, Routine],
        CycleProgress | CycleProgression => &[TrainingCycle],
        _ => &[],
    }
}

/// Every kind that must be fully merged before `kind`, in merge order.
pub fn prerequisites(kind: EntityKind) -> Vec<EntityKind> {
    let mut seen = BTreeSet::new();
    let mut stack = direct_prerequisites(kind).to_vec();

    while let Some(next) = stack.pop() {
        if seen.insert(next) {
            stack.extend_from_slice(direct_prerequisites(next));
        }
    }

    merge_order()
        .into_iter()
        .filter(|candidate| seen.contains(candidate))
        .collect()
}

/// A topological order over all kinds.
///
/// Kahn's algorithm; among ready kinds the earliest declared is taken first,
/// so the result is stable across runs.
pub fn merge_order() -> Vec<EntityKind> {
    let mut remaining: Vec<EntityKind> = EntityKind::ALL.to_vec();
    let mut order = Vec::with_capacity(remaining.len());

    while let Some(ready) = remaining.iter().position(|kind| {
        direct_prerequisites(*kind)
            .iter()
            .all(|parent| order.contains(parent))
    }) {
        order.push(remaining.remove(ready));
    }
    debug_assert!(
        remaining.is_empty(),
        "dependency table has a cycle through {remaining:?}"
    );

    order
}

/// Merge order restricted to the kinds present in `batch`.
pub fn plan(batch: &EntityBatch) -> Vec<EntityKind> {
    merge_order()
        .into_iter()
        .filter(|kind| batch.contains(*kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompletedSet, PlannedSet, Routine, RoutineExercise, SyncMeta, SyncRecord, WorkoutSession,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_order_matches_declaration_order() {
        assert_eq!(merge_order(), EntityKind::ALL.to_vec());
    }

    #[test]
    fn merge_order_places_parents_first() {
        let order = merge_order();
        let position = |kind| order.iter().position(|k| *k == kind).unwrap();

        for kind in EntityKind::ALL {
            for parent in direct_prerequisites(kind) {
                assert!(position(*parent) < position(kind), "{parent} before {kind}");
            }
        }
    }

    #[test]
    fn prerequisites_are_transitive_and_ordered() {
        assert_eq!(
            prerequisites(EntityKind::CompletedSet),
            vec![
                EntityKind::Routine,
                EntityKind::Superset,
                EntityKind::RoutineExercise,
                EntityKind::PlannedSet,
                EntityKind::WorkoutSession,
            ]
        );
        assert!(prerequisites(EntityKind::Routine).is_empty());
    }

    #[test]
    fn plan_orders_batch_kinds_regardless_of_insertion() {
        let mut batch = EntityBatch::new();
        batch.push(CompletedSet::new(SyncMeta::new("C1", 1), "W1", "squat", 1));
        batch.push(PlannedSet::new(SyncMeta::new("P1", 1), "E1", 1));
        batch.push(WorkoutSession::new(SyncMeta::new("W1", 1), 1));
        batch.push(RoutineExercise::new(SyncMeta::new("E1", 1), "R1", "squat", 0));
        batch.push(Routine::new(SyncMeta::new("R1", 1), "Legs"));

        assert_eq!(
            plan(&batch),
            vec![
                EntityKind::Routine,
                EntityKind::RoutineExercise,
                EntityKind::PlannedSet,
                EntityKind::WorkoutSession,
                EntityKind::CompletedSet,
            ]
        );
    }

    #[test]
    fn record_parents_are_declared_prerequisites() {
        let mut exercise = RoutineExercise::new(SyncMeta::new("E1", 1), "R1", "squat", 0);
        exercise.superset_id = Some("S1".to_string());
        let mut completed = CompletedSet::new(SyncMeta::new("C1", 1), "W1", "squat", 1);
        completed.planned_set_id = Some("P1".to_string());

        for record in [SyncRecord::from(exercise), SyncRecord::from(completed)] {
            let allowed = direct_prerequisites(record.kind());
            for parent in record.parent_refs() {
                assert!(allowed.contains(&parent.kind));
            }
        }
    }
}
