//! Records partitioned by kind

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{EntityKind, SyncRecord};

/// A set of records partitioned by kind, in submission order within a kind.
///
/// On the wire this is a JSON object with one array per kind, keyed by the
/// kind's wire name (`routines`, `routineExercises`, ...). Serialization
/// always emits every kind, empty ones included. Deserialization ignores keys
/// that are not a known kind and treats `null` as an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch {
    records: BTreeMap<EntityKind, Vec<SyncRecord>>,
}

impl EntityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of its kind's list.
    pub fn push(&mut self, record: impl Into<SyncRecord>) {
        let record = record.into();
        self.records.entry(record.kind()).or_default().push(record);
    }

    #[must_use]
    pub fn with(mut self, record: impl Into<SyncRecord>) -> Self {
        self.push(record);
        self
    }

    /// Replace the records of one kind.
    pub fn set(&mut self, kind: EntityKind, records: Vec<SyncRecord>) {
        debug_assert!(records.iter().all(|record| record.kind() == kind));
        if records.is_empty() {
            self.records.remove(&kind);
        } else {
            self.records.insert(kind, records);
        }
    }

    pub fn records(&self, kind: EntityKind) -> &[SyncRecord] {
        self.records.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        !self.records(kind).is_empty()
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every record, kinds in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &SyncRecord> {
        self.records.values().flatten()
    }

    /// Per-kind record counts, only for kinds that have records.
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        self.records
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(kind, records)| (*kind, records.len()))
            .collect()
    }
}

impl Serialize for EntityBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EntityKind::ALL.len()))?;
        for kind in EntityKind::ALL {
            map.serialize_entry(kind.wire_name(), self.records(kind))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut batch = Self::new();

        for (key, value) in raw {
            let Some(kind) = EntityKind::from_wire_name(&key) else {
                continue;
            };
            let items = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::Array(items) => items,
                _ => return Err(D::Error::custom(format!("`{key}` must be an array"))),
            };

            let records = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    SyncRecord::from_value(kind, item)
                        .map_err(|error| D::Error::custom(format!("{key}[{index}]: {error}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            batch.set(kind, records);
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersonalRecord, Routine, RoutineExercise, SyncMeta};

    #[test]
    fn serializes_every_kind() {
        let batch = EntityBatch::new().with(Routine::new(SyncMeta::new("R1", 100), "Push"));
        let json = serde_json::to_value(&batch).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), EntityKind::ALL.len());
        assert_eq!(object["routines"][0]["clientId"], "R1");
        assert_eq!(object["supersets"], serde_json::json!([]));
    }

    #[test]
    fn deserialize_skips_unknown_kinds_and_nulls() {
        let batch: EntityBatch = serde_json::from_value(serde_json::json!({
            "routines": [{"clientId": "R1", "updatedAt": 100, "name": "Push"}],
            "supersets": null,
            "heartRateZones": [{"clientId": "Z1"}],
        }))
        .unwrap();

        assert_eq!(batch.len(), 1);
        assert!(batch.contains(EntityKind::Routine));
        assert!(!batch.contains(EntityKind::Superset));
    }

    #[test]
    fn deserialize_reports_offending_index() {
        let error = serde_json::from_value::<EntityBatch>(serde_json::json!({
            "routines": [
                {"clientId": "R1", "updatedAt": 100, "name": "Push"},
                {"clientId": "R2", "name": "missing clock"},
            ],
        }))
        .unwrap_err();

        assert!(error.to_string().contains("routines[1]"));
    }

    #[test]
    fn keeps_submission_order_within_kind() {
        let mut batch = EntityBatch::new();
        batch.push(RoutineExercise::new(SyncMeta::new("E2", 1), "R1", "row", 1));
        batch.push(PersonalRecord::new(SyncMeta::new("P1", 1), "row", "max_weight", 80.0, 1));
        batch.push(RoutineExercise::new(SyncMeta::new("E1", 1), "R1", "curl", 0));

        let ids = batch
            .records(EntityKind::RoutineExercise)
            .iter()
            .map(SyncRecord::client_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["E2", "E1"]);
        assert_eq!(batch.counts().len(), 2);
    }
}
