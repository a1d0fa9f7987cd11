//! Snapshots and per-dataset histories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::schema::Schema;

/// One timestamped recording of a schema in a dataset's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Position in the history, oldest = 0. Derived, never stored.
    #[serde(skip)]
    version: usize,
    timestamp: DateTime<Utc>,
    columns: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<Checksum>,
}

impl SchemaSnapshot {
    pub(crate) fn new(version: usize, schema: Schema, timestamp: DateTime<Utc>) -> Self {
        let fingerprint = Some(schema.fingerprint());
        Self {
            version,
            timestamp,
            columns: schema,
            fingerprint,
        }
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn schema(&self) -> &Schema {
        &self.columns
    }

    pub fn into_schema(self) -> Schema {
        self.columns
    }

    /// Stored fingerprint, if the document carried one
    pub fn fingerprint(&self) -> Option<&Checksum> {
        self.fingerprint.as_ref()
    }
}

/// Append-only, oldest-first sequence of snapshots for one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaHistory {
    snapshots: Vec<SchemaSnapshot>,
}

impl SchemaHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history read from storage.
    ///
    /// Assigns positions and checks every stored fingerprint; the first
    /// mismatch is reported rather than repaired.
    pub(crate) fn from_stored(mut snapshots: Vec<SchemaSnapshot>) -> Result<Self, String> {
        for (version, snapshot) in snapshots.iter_mut().enumerate() {
            snapshot.version = version;
            if let Some(expected) = &snapshot.fingerprint {
                if !expected.verify(snapshot.columns.columns()) {
                    return Err(format!(
                        "fingerprint mismatch in entry {} (expected {})",
                        version, expected
                    ));
                }
            }
        }
        Ok(Self { snapshots })
    }

    /// Append a schema as the new last snapshot
    pub(crate) fn push(&mut self, schema: Schema, timestamp: DateTime<Utc>) -> &SchemaSnapshot {
        let version = self.snapshots.len();
        self.snapshots.push(SchemaSnapshot::new(version, schema, timestamp));
        &self.snapshots[version]
    }

    /// Most recent snapshot, if any
    pub fn latest(&self) -> Option<&SchemaSnapshot> {
        self.snapshots.last()
    }

    pub fn get(&self, version: usize) -> Option<&SchemaSnapshot> {
        self.snapshots.get(version)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaSnapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[SchemaSnapshot] {
        &self.snapshots
    }
}

impl<'a> IntoIterator for &'a SchemaHistory {
    type Item = &'a SchemaSnapshot;
    type IntoIter = std::slice::Iter<'a, SchemaSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(pairs: &[(&str, &str, bool)]) -> Schema {
        Schema::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_push_assigns_versions() {
        let mut history = SchemaHistory::new();
        assert!(history.latest().is_none());

        history.push(schema(&[("id", "Int64", false)]), Utc::now());
        let second = history.push(Schema::empty(), Utc::now()).version();

        assert_eq!(second, 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().version(), 1);
        assert!(history.latest().unwrap().schema().is_empty());
    }

    #[test]
    fn test_document_layout() {
        let mut history = SchemaHistory::new();
        history.push(schema(&[("id", "Int64", false)]), Utc::now());

        let json = serde_json::to_value(&history).unwrap();
        let entry = &json.as_array().unwrap()[0];
        assert!(entry["timestamp"].is_string());
        assert_eq!(entry["columns"][0]["name"], "id");
        assert_eq!(entry["columns"][0]["type"], "Int64");
        assert_eq!(entry["columns"][0]["nullable"], false);
        assert!(entry.get("version").is_none());
    }

    #[test]
    fn test_from_stored_detects_tampering() {
        let json = serde_json::json!([{
            "timestamp": "2025-01-01T00:00:00Z",
            "columns": [{ "name": "id", "type": "Int64", "nullable": false }],
            "fingerprint": "0000"
        }]);
        let snapshots: Vec<SchemaSnapshot> = serde_json::from_value(json).unwrap();
        assert!(SchemaHistory::from_stored(snapshots).is_err());
    }

    #[test]
    fn test_from_stored_without_fingerprint() {
        let json = serde_json::json!([
            { "timestamp": "2025-01-01T00:00:00Z", "columns": [] },
            { "timestamp": "2025-01-02T00:00:00Z", "columns": [] }
        ]);
        let snapshots: Vec<SchemaSnapshot> = serde_json::from_value(json).unwrap();
        let history = SchemaHistory::from_stored(snapshots).unwrap();
        assert_eq!(history.get(1).unwrap().version(), 1);
        assert!(history.get(0).unwrap().fingerprint().is_none());
    }
}
