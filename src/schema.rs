//! Column and schema types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::error::{DriftError, Result};

/// Description of a single column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within a schema
    pub name: String,
    /// Engine type identifier (e.g. "Int64", "String")
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column admits nulls
    pub nullable: bool,
}

impl ColumnSpec {
    /// Create a new column description
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// An ordered set of columns with unique names.
///
/// Order is kept as supplied by the source dataset and survives
/// serialization, but equality is name-keyed: two schemas with the same
/// columns in a different order compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnSpec>", into = "Vec<ColumnSpec>")]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DriftError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// A schema with no columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a schema from `(name, type, nullable)` triples
    pub fn from_pairs<I, N, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T, bool)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, data_type, nullable)| ColumnSpec::new(name, data_type, nullable))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in source order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Order-independent fingerprint of the columns
    pub fn fingerprint(&self) -> Checksum {
        Checksum::of_columns(&self.columns)
    }

    /// Name-keyed equality, ignoring column order
    pub fn same_shape(&self, other: &Schema) -> bool {
        self.len() == other.len()
            && self
                .columns
                .iter()
                .all(|c| other.column(&c.name) == Some(c))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other)
    }
}

impl Eq for Schema {}

impl TryFrom<Vec<ColumnSpec>> for Schema {
    type Error = DriftError;

    fn try_from(columns: Vec<ColumnSpec>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<Schema> for Vec<ColumnSpec> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

/// Anything that can describe its own column structure.
///
/// Dataset engines implement this at the boundary so the registry never has
/// to look at actual data.
pub trait SchemaSource {
    fn schema(&self) -> Result<Schema>;
}

impl SchemaSource for Schema {
    fn schema(&self) -> Result<Schema> {
        Ok(self.clone())
    }
}

impl SchemaSource for [ColumnSpec] {
    fn schema(&self) -> Result<Schema> {
        Schema::new(self.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::from_pairs([("id", "Int64", false), ("name", "String", true)]).unwrap()
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Schema::from_pairs([("id", "Int64", false), ("id", "String", false)]);
        match result {
            Err(DriftError::DuplicateColumn { name }) => assert_eq!(name, "id"),
            other => panic!("Expected DuplicateColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let schema = users();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let reordered =
            Schema::from_pairs([("name", "String", true), ("id", "Int64", false)]).unwrap();
        assert_eq!(users(), reordered);
        assert_eq!(users().fingerprint(), reordered.fingerprint());
    }

    #[test]
    fn test_nullable_flip_is_not_equal() {
        let flipped =
            Schema::from_pairs([("id", "Int64", true), ("name", "String", true)]).unwrap();
        assert_ne!(users(), flipped);
        assert_ne!(users().fingerprint(), flipped.fingerprint());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(users()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "name": "id", "type": "Int64", "nullable": false },
                { "name": "name", "type": "String", "nullable": true }
            ])
        );
    }

    #[test]
    fn test_deserialize_revalidates() {
        let json = r#"[
            { "name": "a", "type": "Int64", "nullable": false },
            { "name": "a", "type": "Int64", "nullable": false }
        ]"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());
    }

    #[test]
    fn test_empty_schema_is_valid() {
        let schema = Schema::empty();
        assert!(schema.is_empty());
        assert_eq!(schema, Schema::new(vec![]).unwrap());
    }
}
