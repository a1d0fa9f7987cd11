//! Schema drift detection
//!
//! Compares two schemas by column name and classifies the differences.
//! Column order never matters.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnSpec, Schema};

/// A column present in both schemas whose type or nullability differs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    pub name: String,
    pub old_type: String,
    pub new_type: String,
    pub old_nullable: bool,
    pub new_nullable: bool,
}

impl TypeChange {
    fn between(old: &ColumnSpec, new: &ColumnSpec) -> Option<Self> {
        if old.data_type == new.data_type && old.nullable == new.nullable {
            return None;
        }
        Some(Self {
            name: new.name.clone(),
            old_type: old.data_type.clone(),
            new_type: new.data_type.clone(),
            old_nullable: old.nullable,
            new_nullable: new.nullable,
        })
    }

    pub fn type_changed(&self) -> bool {
        self.old_type != self.new_type
    }

    pub fn nullability_changed(&self) -> bool {
        self.old_nullable != self.new_nullable
    }
}

impl fmt::Display for TypeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~ {}:", self.name)?;
        if self.type_changed() {
            write!(f, " {} -> {}", self.old_type, self.new_type)?;
        }
        if self.nullability_changed() {
            write!(
                f,
                " {} -> {}",
                nullability(self.old_nullable),
                nullability(self.new_nullable)
            )?;
        }
        Ok(())
    }
}

fn nullability(nullable: bool) -> &'static str {
    if nullable {
        "nullable"
    } else {
        "non-null"
    }
}

/// Differences between two schemas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChanges {
    /// Columns only in the new schema, in new-schema order
    pub added_columns: Vec<String>,
    /// Columns only in the old schema, in old-schema order
    pub removed_columns: Vec<String>,
    /// Columns in both whose type or nullability differs, in new-schema order
    pub type_changes: Vec<TypeChange>,
    /// Full description of each added column, same order as `added_columns`
    #[serde(default)]
    pub added: Vec<ColumnSpec>,
    /// Full description of each removed column, same order as `removed_columns`
    #[serde(default)]
    pub removed: Vec<ColumnSpec>,
}

impl SchemaChanges {
    /// No drift
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.type_changes.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        !self.is_empty()
    }

    /// Total number of individual changes
    pub fn len(&self) -> usize {
        self.added_columns.len() + self.removed_columns.len() + self.type_changes.len()
    }

    /// Description of an added column
    pub fn added_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.added.iter().find(|c| c.name == name)
    }

    /// Description of a removed column, as it was in the old schema
    pub fn removed_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.removed.iter().find(|c| c.name == name)
    }
}

fn column_line(sign: char, name: &str, spec: Option<&ColumnSpec>) -> String {
    match spec {
        Some(spec) => format!("{} {}: {}", sign, name, spec.data_type),
        None => format!("{} {}", sign, name),
    }
}

impl fmt::Display for SchemaChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        let mut lines = Vec::with_capacity(self.len());
        lines.extend(
            self.added_columns
                .iter()
                .map(|name| column_line('+', name, self.added_column(name))),
        );
        lines.extend(
            self.removed_columns
                .iter()
                .map(|name| column_line('-', name, self.removed_column(name))),
        );
        lines.extend(self.type_changes.iter().map(ToString::to_string));
        write!(f, "{}", lines.join("\n"))
    }
}

/// Compare `new` against `old`.
///
/// An absent `old` is the first registration of a dataset: the new schema
/// becomes the baseline and no drift is reported.
pub fn diff(old: Option<&Schema>, new: &Schema) -> SchemaChanges {
    let Some(old) = old else {
        return SchemaChanges::none();
    };

    let old_by_name: HashMap<&str, &ColumnSpec> =
        old.columns().iter().map(|c| (c.name.as_str(), c)).collect();
    let new_by_name: HashMap<&str, &ColumnSpec> =
        new.columns().iter().map(|c| (c.name.as_str(), c)).collect();

    let mut changes = SchemaChanges::none();

    for column in new.columns() {
        match old_by_name.get(column.name.as_str()) {
            None => {
                changes.added_columns.push(column.name.clone());
                changes.added.push(column.clone());
            }
            Some(previous) => {
                if let Some(change) = TypeChange::between(previous, column) {
                    changes.type_changes.push(change);
                }
            }
        }
    }

    for column in old.columns() {
        if !new_by_name.contains_key(column.name.as_str()) {
            changes.removed_columns.push(column.name.clone());
            changes.removed.push(column.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(pairs: &[(&str, &str, bool)]) -> Schema {
        Schema::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_first_registration_is_baseline() {
        let new = schema(&[("id", "Int64", false), ("name", "String", true)]);
        assert!(diff(None, &new).is_empty());
    }

    #[test]
    fn test_identical_schema_has_no_drift() {
        let s = schema(&[("id", "Int64", false), ("name", "String", true)]);
        assert!(diff(Some(&s), &s).is_empty());
    }

    #[test]
    fn test_reordering_is_not_drift() {
        let a = schema(&[
            ("id", "Int64", false),
            ("name", "String", true),
            ("ts", "Datetime", true),
        ]);
        let b = schema(&[
            ("ts", "Datetime", true),
            ("id", "Int64", false),
            ("name", "String", true),
        ]);
        assert!(diff(Some(&a), &b).is_empty());
    }

    #[test]
    fn test_added_removed_and_changed() {
        let old = schema(&[
            ("id", "Int64", false),
            ("name", "String", true),
            ("to_remove", "Boolean", true),
        ]);
        let new = schema(&[
            ("id", "String", false),
            ("name", "String", true),
            ("new_col", "Float64", true),
        ]);

        let changes = diff(Some(&old), &new);
        assert_eq!(changes.added_columns, vec!["new_col"]);
        assert_eq!(changes.removed_columns, vec!["to_remove"]);
        assert_eq!(
            changes.type_changes,
            vec![TypeChange {
                name: "id".to_string(),
                old_type: "Int64".to_string(),
                new_type: "String".to_string(),
                old_nullable: false,
                new_nullable: false,
            }]
        );
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_nullability_only_change() {
        let old = schema(&[("id", "Int64", false)]);
        let new = schema(&[("id", "Int64", true)]);

        let changes = diff(Some(&old), &new);
        assert_eq!(changes.type_changes.len(), 1);
        let change = &changes.type_changes[0];
        assert!(!change.type_changed());
        assert!(change.nullability_changed());
        assert_eq!(change.to_string(), "~ id: non-null -> nullable");
    }

    #[test]
    fn test_added_and_removed_keep_source_order() {
        let old = schema(&[("z", "Int64", false), ("keep", "Int64", false), ("a", "Int8", true)]);
        let new = schema(&[("y", "Int64", false), ("keep", "Int64", false), ("b", "Int8", true)]);

        let changes = diff(Some(&old), &new);
        assert_eq!(changes.added_columns, vec!["y", "b"]);
        assert_eq!(changes.removed_columns, vec!["z", "a"]);
        assert_eq!(
            changes.added,
            vec![ColumnSpec::new("y", "Int64", false), ColumnSpec::new("b", "Int8", true)]
        );
        assert_eq!(changes.removed_column("a"), Some(&ColumnSpec::new("a", "Int8", true)));
        assert_eq!(changes.added_column("keep"), None);
    }

    #[test]
    fn test_empty_new_schema_removes_everything() {
        let old = schema(&[("id", "Int64", false), ("name", "String", true)]);
        let changes = diff(Some(&old), &Schema::empty());
        assert_eq!(changes.removed_columns, vec!["id", "name"]);
        assert!(changes.added_columns.is_empty());
        assert!(changes.type_changes.is_empty());
    }

    #[test]
    fn test_display() {
        let old = schema(&[("id", "Int64", false), ("gone", "Int64", false)]);
        let new = schema(&[("id", "String", false), ("email", "String", true)]);
        assert_eq!(
            diff(Some(&old), &new).to_string(),
            "+ email: String\n- gone: Int64\n~ id: Int64 -> String"
        );
        assert_eq!(SchemaChanges::none().to_string(), "no changes");
    }

    #[test]
    fn test_added_and_removed_carry_column_detail() {
        let old = schema(&[("id", "Int", false)]);
        let new = schema(&[("id", "Int", false), ("email", "Str", true)]);

        let changes = diff(Some(&old), &new);
        let email = changes.added_column("email").unwrap();
        assert_eq!(email.data_type, "Str");
        assert!(email.nullable);
        assert_eq!(changes.to_string(), "+ email: Str");

        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["added_columns"], serde_json::json!(["email"]));
        assert_eq!(
            json["added"],
            serde_json::json!([{ "name": "email", "type": "Str", "nullable": true }])
        );
    }
}
