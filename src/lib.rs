//! Drifter
//!
//! Tracks how the column structure of tabular datasets evolves across
//! pipeline runs. Each call to [`register`] compares a dataset's current
//! schema with the last one recorded under the same name, reports the
//! drift, and appends the schema to that dataset's history.
//!
//! ## Features
//!
//! - **Name-keyed diffing**: added, removed and retyped columns; column order is ignored
//! - **Append-only history**: every observed schema is kept, oldest first
//! - **Atomic writes**: histories are replaced by rename, never half-written
//! - **Fingerprints**: SHA256 per snapshot, checked on every read
//!
//! ## Layout
//!
//! ```text
//! .drifter/
//! ├── users.json     [{ "timestamp": ..., "columns": [...], "fingerprint": ... }, ...]
//! └── orders.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use drifter::{Schema, SchemaRegistry};
//!
//! let registry = SchemaRegistry::open(".drifter");
//! let schema = Schema::from_pairs([("id", "Int64", false), ("name", "String", true)])?;
//! let changes = registry.register(schema, "users")?;
//! if changes.has_changes() {
//!     println!("{}", changes);
//! }
//! # Ok::<(), drifter::DriftError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod diff;
pub mod error;
pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use checksum::Checksum;
pub use config::{DrifterConfig, OutputFormat};
pub use diff::{diff, SchemaChanges, TypeChange};
pub use error::{DriftError, Result};
pub use registry::{register, SchemaRegistry};
pub use schema::{ColumnSpec, Schema, SchemaSource};
pub use snapshot::{SchemaHistory, SchemaSnapshot};
pub use store::HistoryStore;
