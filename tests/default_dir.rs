//! Module-level `register`
//!
//! Kept in its own test binary: it changes the process working directory.

use std::env;
use std::path::PathBuf;

use drifter::{register, Schema};
use tempfile::tempdir;

/// Switches the working directory and switches it back on drop, even when
/// an assertion fails first
struct CurrentDir {
    previous: PathBuf,
}

impl CurrentDir {
    fn enter(dir: &std::path::Path) -> Self {
        let previous = env::current_dir().unwrap();
        env::set_current_dir(dir).unwrap();
        Self { previous }
    }
}

impl Drop for CurrentDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}

#[test]
fn test_module_level_register_uses_default_dir() {
    let dir = tempdir().unwrap();
    let _cwd = CurrentDir::enter(dir.path());

    let schema = Schema::from_pairs([("id", "Int64", false)]).unwrap();
    assert!(register(schema.clone(), "users").unwrap().is_empty());
    assert!(register(schema, "users").unwrap().is_empty());

    assert!(dir.path().join(".drifter/users.json").is_file());
}
