//! Schema Registry
//!
//! Compares incoming schemas to the latest recorded snapshot and appends
//! every observed schema to the dataset's history.

use std::path::PathBuf;

use tracing::warn;

use crate::config::DrifterConfig;
use crate::diff::{diff, SchemaChanges};
use crate::error::{DriftError, Result};
use crate::schema::{Schema, SchemaSource};
use crate::snapshot::{SchemaHistory, SchemaSnapshot};
use crate::store::HistoryStore;

/// The main schema registry
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    store: HistoryStore,
}

impl SchemaRegistry {
    /// Registry configured by `config`
    pub fn new(config: &DrifterConfig) -> Self {
        Self {
            store: HistoryStore::from_config(config),
        }
    }

    /// Registry keeping its histories under `schema_dir`
    pub fn open(schema_dir: impl Into<PathBuf>) -> Self {
        Self::new(&DrifterConfig::with_schema_dir(schema_dir))
    }

    /// The underlying history store
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Record `schema` for dataset `name` and report drift against the
    /// previous snapshot.
    ///
    /// The schema is always appended, drift or not. The first registration of
    /// a name reports no changes. Storage errors are returned as-is; when
    /// one is returned no snapshot was added.
    pub fn register(&self, schema: Schema, name: &str) -> Result<SchemaChanges> {
        let history = self.store.history(name)?;
        let changes = diff(history.latest().map(SchemaSnapshot::schema), &schema);

        if changes.has_changes() {
            warn!(
                dataset = name,
                added = changes.added_columns.len(),
                removed = changes.removed_columns.len(),
                changed = changes.type_changes.len(),
                "schema drift detected"
            );
        }

        self.store.append_to(name, history, schema)?;
        Ok(changes)
    }

    /// Extract a schema from `source` and register it
    pub fn register_source<S>(&self, source: &S, name: &str) -> Result<SchemaChanges>
    where
        S: SchemaSource + ?Sized,
    {
        self.register(source.schema()?, name)
    }

    /// Full recorded history for `name`
    pub fn history(&self, name: &str) -> Result<SchemaHistory> {
        self.store.history(name)
    }

    /// Latest recorded snapshot for `name`
    pub fn latest(&self, name: &str) -> Result<Option<SchemaSnapshot>> {
        self.store.latest(name)
    }

    /// All datasets with a recorded history
    pub fn datasets(&self) -> Result<Vec<String>> {
        self.store.names()
    }

    /// Drift between two recorded versions of `name`
    pub fn diff_versions(&self, name: &str, from: usize, to: usize) -> Result<SchemaChanges> {
        let history = self.store.history(name)?;
        let lookup = |version: usize| {
            history.get(version).ok_or_else(|| DriftError::SnapshotNotFound {
                name: name.to_string(),
                version,
            })
        };
        let old = lookup(from)?;
        let new = lookup(to)?;
        Ok(diff(Some(old.schema()), new.schema()))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(&DrifterConfig::default())
    }
}

/// Register `schema` under `name` with a default registry (`./.drifter`)
pub fn register(schema: Schema, name: &str) -> Result<SchemaChanges> {
    SchemaRegistry::default().register(schema, name)
}
