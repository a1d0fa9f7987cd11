//! Checksum utilities for snapshot integrity verification

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::ColumnSpec;

/// SHA256 fingerprint of a column set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute the checksum of a set of columns.
    ///
    /// Columns are hashed in name order so the result does not depend on
    /// the order the source dataset reported them in.
    pub fn of_columns(columns: &[ColumnSpec]) -> Self {
        let mut sorted: Vec<&ColumnSpec> = columns.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut hasher = Sha256::new();
        for column in sorted {
            hasher.update(column.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(column.data_type.as_bytes());
            hasher.update([0u8, column.nullable as u8, 0x1e]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that columns match this checksum
    pub fn verify(&self, columns: &[ColumnSpec]) -> bool {
        *self == Self::of_columns(columns)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
