//! Which entity kinds a store can hold

use std::collections::BTreeSet;

use libsql::Connection;

use crate::error::Result;
use crate::models::EntityKind;

/// The set of entity kinds whose tables exist in a store.
///
/// Older device schemas predate some kinds; the merge engine and exporter
/// skip unsupported kinds instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCapabilities {
    kinds: BTreeSet<EntityKind>,
}

impl StoreCapabilities {
    pub fn all() -> Self {
        Self::from_kinds(EntityKind::ALL)
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Inspect `sqlite_master` for entity tables.
    pub async fn detect(conn: &Connection) -> Result<Self> {
        let mut rows = conn
            .query("SELECT name FROM sqlite_master WHERE type = 'table'", ())
            .await?;

        let mut kinds = BTreeSet::new();
        while let Some(row) = rows.next().await? {
            let name: String = row.get(0)?;
            if let Some(kind) = EntityKind::from_table_name(&name) {
                kinds.insert(kind);
            }
        }

        Ok(Self { kinds })
    }

    pub fn supports(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Kinds this store cannot hold, in dependency order.
    pub fn missing(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| !self.supports(*kind))
            .collect()
    }
}
