//! Slot-name table persistence.
//!
//! The table is a flat JSON array indexed by slot, e.g.
//! `["alpha","beta",null,"delta"]`. `null` entries (slots that never got a
//! name) load as empty names.

use crate::errors::StreamerError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where the slot-name table lives.
pub trait SlotNameStore: Send + 'static {
    /// Load the stored table, `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Persistence`] if the table exists but cannot be read.
    fn load(&self) -> Result<Option<Vec<String>>, StreamerError>;

    /// Overwrite the stored table.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Persistence`] if the table cannot be written.
    fn save(&self, names: &[String]) -> Result<(), StreamerError>;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SlotNameStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<String>>, StreamerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let names: Vec<Option<String>> = serde_json::from_str(&raw)?;
        Ok(Some(names.into_iter().map(Option::unwrap_or_default).collect()))
    }

    fn save(&self, names: &[String]) -> Result<(), StreamerError> {
        let json = serde_json::to_string(names)?;
        // Write-then-rename so a crash never leaves a truncated table
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Persistence disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SlotNameStore for NullStore {
    fn load(&self) -> Result<Option<Vec<String>>, StreamerError> {
        Ok(None)
    }

    fn save(&self, _names: &[String]) -> Result<(), StreamerError> {
        Ok(())
    }
}

/// Pick the startup slot names.
///
/// A stored table wins only if it has exactly one entry per configured slot;
/// the slot count is fixed by configuration.
#[must_use]
pub fn reconcile(configured: Vec<String>, stored: Option<Vec<String>>) -> Vec<String> {
    match stored {
        Some(stored) if stored.len() == configured.len() => stored,
        Some(stored) => {
            warn!(
                target: "streamer.persistence",
                stored = stored.len(),
                configured = configured.len(),
                "Stored slot-name table has the wrong length, using configured names"
            );
            configured
        }
        None => configured,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("names.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("names.json"));

        store.save(&names(&["alpha", "", "henne"])).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"["alpha","","henne"]"#);
        assert_eq!(store.load().unwrap(), Some(names(&["alpha", "", "henne"])));
    }

    #[test]
    fn test_null_entries_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        fs::write(&path, r#"["alpha",null,null]"#).unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(loaded, Some(names(&["alpha", "", ""])));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        fs::write(&path, "{not json").unwrap();

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(StreamerError::Persistence(_))));
    }

    #[test]
    fn test_reconcile_prefers_matching_stored_table() {
        let configured = names(&["a", "b"]);
        assert_eq!(
            reconcile(configured.clone(), Some(names(&["x", "y"]))),
            names(&["x", "y"])
        );
        assert_eq!(
            reconcile(configured.clone(), Some(names(&["x"]))),
            configured
        );
        assert_eq!(reconcile(configured.clone(), None), configured);
    }
}
