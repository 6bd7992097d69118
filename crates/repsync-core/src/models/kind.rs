//! Entity kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every syncable entity kind.
///
/// Declaration order is a valid dependency order: each kind appears after
/// every kind it may reference. `Ord` follows declaration order, so ordered
/// maps keyed by kind iterate parents before children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "userProfiles")]
    UserProfile,
    #[serde(rename = "customExercises")]
    CustomExercise,
    #[serde(rename = "routines")]
    Routine,
    #[serde(rename = "supersets")]
    Superset,
    #[serde(rename = "routineExercises")]
    RoutineExercise,
    #[serde(rename = "plannedSets")]
    PlannedSet,
    #[serde(rename = "workoutSessions")]
    WorkoutSession,
    #[serde(rename = "completedSets")]
    CompletedSet,
    #[serde(rename = "personalRecords")]
    PersonalRecord,
    #[serde(rename = "trainingCycles")]
    TrainingCycle,
    #[serde(rename = "cycleDays")]
    CycleDay,
    #[serde(rename = "cycleProgress")]
    CycleProgress,
    #[serde(rename = "cycleProgressions")]
    CycleProgression,
    #[serde(rename = "earnedBadges")]
    EarnedBadge,
    #[serde(rename = "streakHistory")]
    StreakHistory,
    #[serde(rename = "gamificationStats")]
    GamificationStats,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 16] = [
        Self::UserProfile,
        Self::CustomExercise,
        Self::Routine,
        Self::Superset,
        Self::RoutineExercise,
        Self::PlannedSet,
        Self::WorkoutSession,
        Self::CompletedSet,
        Self::PersonalRecord,
        Self::TrainingCycle,
        Self::CycleDay,
        Self::CycleProgress,
        Self::CycleProgression,
        Self::EarnedBadge,
        Self::StreakHistory,
        Self::GamificationStats,
    ];

    /// Key used for this kind in push/pull payloads and snapshot documents.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::UserProfile => "userProfiles",
            Self::CustomExercise => "customExercises",
            Self::Routine => "routines",
            Self::Superset => "supersets",
            Self::RoutineExercise => "routineExercises",
            Self::PlannedSet => "plannedSets",
            Self::WorkoutSession => "workoutSessions",
            Self::CompletedSet => "completedSets",
            Self::PersonalRecord => "personalRecords",
            Self::TrainingCycle => "trainingCycles",
            Self::CycleDay => "cycleDays",
            Self::CycleProgress => "cycleProgress",
            Self::CycleProgression => "cycleProgressions",
            Self::EarnedBadge => "earnedBadges",
            Self::StreakHistory => "streakHistory",
            Self::GamificationStats => "gamificationStats",
        }
    }

    /// Backing table name in both the local and the server store.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::UserProfile => "user_profiles",
            Self::CustomExercise => "custom_exercises",
            Self::Routine => "routines",
            Self::Superset => "supersets",
            Self::RoutineExercise => "routine_exercises",
            Self::PlannedSet => "planned_sets",
            Self::WorkoutSession => "workout_sessions",
            Self::CompletedSet => "completed_sets",
            Self::PersonalRecord => "personal_records",
            Self::TrainingCycle => "training_cycles",
            Self::CycleDay => "cycle_days",
            Self::CycleProgress => "cycle_progress",
            Self::CycleProgression => "cycle_progressions",
            Self::EarnedBadge => "earned_badges",
            Self::StreakHistory => "streak_history",
            Self::GamificationStats => "gamification_stats",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::from_wire_name(trimmed)
            .or_else(|| Self::from_table_name(trimmed))
            .ok_or_else(|| format!("unknown entity kind: {trimmed}"))
    }
}
