//! Error types for the schema registry

use std::path::PathBuf;

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Schema registry errors
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt schema history at {}: {reason}", .path.display())]
    CorruptHistory { path: PathBuf, reason: String },

    #[error("Invalid schema: duplicate column '{name}'")]
    DuplicateColumn { name: String },

    #[error("Invalid dataset name: {0:?}")]
    InvalidDatasetName(String),

    #[error("Snapshot not found: {name} version {version}")]
    SnapshotNotFound { name: String, version: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl DriftError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptHistory {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of the underlying storage location
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// True when a persisted history exists but could not be read back
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptHistory { .. })
    }
}
