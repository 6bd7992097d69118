//! Kind-erased record type shared by the merge engine, stores and wire formats

use serde::Serialize;

use super::{
    CompletedSet, CustomExercise, CycleDay, CycleProgress, CycleProgression, EarnedBadge,
    EntityKind, GamificationStats, ParentRef, PersonalRecord, PlannedSet, Routine,
    RoutineExercise, StreakHistory, Superset, SyncMeta, TrainingCycle, UserProfile,
    WorkoutSession,
};

/// Common interface of every syncable entity.
pub trait SyncEntity {
    /// Kind tag of this entity type
    const KIND: EntityKind;

    fn meta(&self) -> &SyncMeta;

    fn meta_mut(&mut self) -> &mut SyncMeta;

    /// Parents that must exist before this record can be persisted
    fn parent_refs(&self) -> Vec<ParentRef> {
        Vec::new()
    }

    fn client_id(&self) -> &str {
        &self.meta().client_id
    }

    fn updated_at(&self) -> i64 {
        self.meta().updated_at
    }

    fn deleted_at(&self) -> Option<i64> {
        self.meta().deleted_at
    }
}

/// Implements the metadata accessors of [`SyncEntity`] for a struct with a `meta` field.
macro_rules! sync_meta_accessors {
    () => {
        fn meta(&self) -> &$crate::models::SyncMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut $crate::models::SyncMeta {
            &mut self.meta
        }
    };
}

pub(crate) use sync_meta_accessors;

macro_rules! sync_records {
    ($($variant:ident),* $(,)?) => {
        /// A record of any kind.
        ///
        /// Serializes as the inner entity (no tag); the kind is carried by the
        /// enclosing batch key.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum SyncRecord {
            $($variant($variant),)*
        }

        impl SyncRecord {
            pub const fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => EntityKind::$variant,)*
                }
            }

            pub fn meta(&self) -> &SyncMeta {
                match self {
                    $(Self::$variant(record) => record.meta(),)*
                }
            }

            pub fn meta_mut(&mut self) -> &mut SyncMeta {
                match self {
                    $(Self::$variant(record) => record.meta_mut(),)*
                }
            }

            pub fn parent_refs(&self) -> Vec<ParentRef> {
                match self {
                    $(Self::$variant(record) => record.parent_refs(),)*
                }
            }

            /// Decode a record of the given kind from JSON.
            ///
            /// Fields this build does not know are ignored.
            pub fn from_value(kind: EntityKind, value: serde_json::Value) -> serde_json::Result<Self> {
                match kind {
                    $(EntityKind::$variant => serde_json::from_value(value).map(Self::$variant),)*
                }
            }
        }

        $(
            impl From<$variant> for SyncRecord {
                fn from(record: $variant) -> Self {
                    Self::$variant(record)
                }
            }
        )*
    };
}

sync_records!(
    UserProfile,
    CustomExercise,
    Routine,
    Superset,
    RoutineExercise,
    PlannedSet,
    WorkoutSession,
    CompletedSet,
    PersonalRecord,
    TrainingCycle,
    CycleDay,
    CycleProgress,
    CycleProgression,
    EarnedBadge,
    StreakHistory,
    GamificationStats,
);

impl SyncRecord {
    pub fn client_id(&self) -> &str {
        &self.meta().client_id
    }

    pub fn updated_at(&self) -> i64 {
        self.meta().updated_at
    }

    pub fn deleted_at(&self) -> Option<i64> {
        self.meta().deleted_at
    }

    pub fn server_id(&self) -> Option<&str> {
        self.meta().server_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_ignores_unknown_fields() {
        let value = serde_json::json!({
            "clientId": "R1",
            "updatedAt": 100,
            "name": "Push day",
            "colorTheme": "teal",
        });

        let record = SyncRecord::from_value(EntityKind::Routine, value).unwrap();

        assert_eq!(record.kind(), EntityKind::Routine);
        assert_eq!(record.client_id(), "R1");
        assert_eq!(record.updated_at(), 100);
        assert_eq!(record.deleted_at(), None);
    }

    #[test]
    fn serializes_without_kind_tag() {
        let record = SyncRecord::from(Routine::new(SyncMeta::new("R1", 100), "Legs"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["clientId"], "R1");
        assert_eq!(json["name"], "Legs");
        assert!(json.get("Routine").is_none());
    }

    #[test]
    fn child_exposes_parent_refs() {
        let exercise = RoutineExercise::new(SyncMeta::new("E1", 100), "R1", "bench-press", 0);
        let record = SyncRecord::from(exercise);

        assert_eq!(
            record.parent_refs(),
            vec![ParentRef::new(EntityKind::Routine, "R1")]
        );
    }
}
