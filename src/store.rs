//! History Store
//!
//! Durable, append-only storage of schema histories. Each dataset name maps
//! to one JSON document under the store root:
//!
//! ```text
//! .drifter/
//! ├── users.json
//! ├── %4Frders.json              <- "Orders"
//! ├── sales%2F2024.json          <- "sales/2024"
//! ├── %C3%A9%C3%A9...~3f9a...json <- long name, shortened
//! └── %C3%A9%C3%A9...~3f9a...name <- its full name
//! ```
//!
//! Names are encoded byte by byte: `[a-z0-9_-]` pass through, every other
//! byte (upper-case letters included) becomes `%XX`. The encoding is
//! injective even under case folding, so two names never share a document,
//! and reversible, so [`HistoryStore::names`] can list datasets.
//!
//! Encodings longer than [`MAX_STEM_LEN`] are shortened to a prefix plus
//! `~` and the SHA256 of the full name. `~` never appears in a plain
//! encoding. The full name is kept next to the document in a `.name` file.
//!
//! Writes go to a temporary file in the same directory which then replaces
//! the document by rename; readers see either the old or the new history.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{DrifterConfig, OutputFormat};
use crate::error::{DriftError, Result};
use crate::schema::Schema;
use crate::snapshot::{SchemaHistory, SchemaSnapshot};

const EXTENSION: &str = "json";
const NAME_EXTENSION: &str = "name";

/// Longest file stem written as a plain encoding
pub const MAX_STEM_LEN: usize = 200;

/// Length of the readable prefix kept in a shortened stem
const HASHED_PREFIX_LEN: usize = 64;

/// File-backed history storage rooted at one directory
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
    format: OutputFormat,
    sync: bool,
}

impl HistoryStore {
    /// Store rooted at `root` with default storage settings
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = DrifterConfig::default();
        Self {
            root: root.into(),
            format: defaults.storage.output_format,
            sync: defaults.storage.sync,
        }
    }

    /// Store described by a configuration
    pub fn from_config(config: &DrifterConfig) -> Self {
        Self {
            root: config.schema_dir(),
            format: config.storage.output_format,
            sync: config.storage.sync,
        }
    }

    /// Get the root path of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the history document for `name`
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(DriftError::InvalidDatasetName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", file_stem(name), EXTENSION)))
    }

    /// Full history for `name`, oldest first; empty if none was recorded
    pub fn history(&self, name: &str) -> Result<SchemaHistory> {
        let path = self.path_for(name)?;
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SchemaHistory::new()),
            Err(e) => return Err(DriftError::storage(path, e)),
        };

        let snapshots: Vec<SchemaSnapshot> =
            serde_json::from_slice(&content).map_err(|e| DriftError::corrupt(&path, e))?;
        let history = SchemaHistory::from_stored(snapshots)
            .map_err(|reason| DriftError::corrupt(&path, reason))?;

        debug!(
            dataset = name,
            path = %path.display(),
            entries = history.len(),
            "loaded schema history"
        );
        Ok(history)
    }

    /// Most recent snapshot for `name`, or `None` for an unknown dataset
    pub fn latest(&self, name: &str) -> Result<Option<SchemaSnapshot>> {
        let history = self.history(name)?;
        Ok(history.latest().cloned())
    }

    /// Record `schema` as the newest snapshot of `name`.
    ///
    /// Either the whole updated history is persisted or nothing is: on
    /// error the previous document is left untouched.
    pub fn append(&self, name: &str, schema: Schema) -> Result<SchemaSnapshot> {
        let history = self.history(name)?;
        self.append_to(name, history, schema)
    }

    /// Append to a history already loaded with [`HistoryStore::history`]
    /// for the same `name`, without reading it again.
    pub(crate) fn append_to(
        &self,
        name: &str,
        mut history: SchemaHistory,
        schema: Schema,
    ) -> Result<SchemaSnapshot> {
        let path = self.path_for(name)?;
        let snapshot = history.push(schema, Utc::now()).clone();

        let content = match self.format {
            OutputFormat::Pretty => serde_json::to_vec_pretty(&history)?,
            OutputFormat::Compact => serde_json::to_vec(&history)?,
        };

        fs::create_dir_all(&self.root).map_err(|e| DriftError::storage(&self.root, e))?;

        if is_hashed_stem(&file_stem(name)) {
            let name_path = path.with_extension(NAME_EXTENSION);
            if !name_path.exists() {
                self.write_atomic(&name_path, name.as_bytes())?;
            }
        }
        self.write_atomic(&path, &content)?;

        info!(dataset = name, version = snapshot.version(), "appended schema snapshot");
        Ok(snapshot)
    }

    /// Every dataset name with a history under the root, sorted
    pub fn names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DriftError::storage(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| DriftError::storage(&self.root, e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = if is_hashed_stem(stem) {
                self.read_full_name(&path.with_extension(NAME_EXTENSION), stem)?
            } else {
                decode_name(stem)
            };
            names.extend(name);
        }
        names.sort();
        Ok(names)
    }

    /// Full name stored beside a shortened document, if it maps back to `stem`
    fn read_full_name(&self, name_path: &Path, stem: &str) -> Result<Option<String>> {
        let bytes = match fs::read(name_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DriftError::storage(name_path, e)),
        };
        Ok(String::from_utf8(bytes)
            .ok()
            .filter(|name| !name.is_empty() && file_stem(name) == stem))
    }

    fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut tmp =
            NamedTempFile::new_in(&self.root).map_err(|e| DriftError::storage(&self.root, e))?;
        tmp.write_all(content)
            .map_err(|e| DriftError::storage(tmp.path(), e))?;
        if self.sync {
            tmp.as_file()
                .sync_all()
                .map_err(|e| DriftError::storage(tmp.path(), e))?;
        }
        tmp.persist(path)
            .map_err(|e| DriftError::storage(path, e.error))?;
        if self.sync {
            self.sync_root()?;
        }
        Ok(())
    }

    /// Make the rename itself durable
    #[cfg(unix)]
    fn sync_root(&self) -> Result<()> {
        fs::File::open(&self.root)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| DriftError::storage(&self.root, e))
    }

    // Directories cannot be opened as files here; the rename is durable
    // once the call returns.
    #[cfg(not(unix))]
    fn sync_root(&self) -> Result<()> {
        Ok(())
    }
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-'
}

fn is_hashed_stem(stem: &str) -> bool {
    stem.contains('~')
}

/// File stem for `name`: the plain encoding, or a shortened one when that
/// would be longer than [`MAX_STEM_LEN`]
pub fn file_stem(name: &str) -> String {
    let encoded = encode_name(name);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }

    // Cut on an escape boundary so the prefix stays readable
    let bytes = encoded.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        let token = if bytes[end] == b'%' { 3 } else { 1 };
        if end + token > HASHED_PREFIX_LEN {
            break;
        }
        end += token;
    }
    format!("{}~{:x}", &encoded[..end], Sha256::digest(name.as_bytes()))
}

/// Filesystem-safe, reversible encoding of a dataset name
pub fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if is_plain(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Inverse of [`encode_name`]; `None` for anything it could not have produced
pub fn decode_name(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = encoded.get(i + 1..i + 3)?;
                if !hex.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
                    return None;
                }
                let byte = u8::from_str_radix(hex, 16).ok()?;
                if is_plain(byte) {
                    return None;
                }
                decoded.push(byte);
                i += 3;
            }
            b if is_plain(b) => {
                decoded.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    if decoded.is_empty() {
        return None;
    }
    String::from_utf8(decoded).ok()
}
