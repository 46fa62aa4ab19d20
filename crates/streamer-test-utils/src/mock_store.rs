//! In-memory slot-name store.

use std::sync::{Arc, Mutex};
use streamer_core::errors::StreamerError;
use streamer_core::persistence::SlotNameStore;

#[derive(Debug, Default)]
struct StoreState {
    names: Option<Vec<String>>,
    saves: usize,
}

/// Slot-name store backed by memory. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotNameStore {
    state: Arc<Mutex<StoreState>>,
    fail_load: bool,
    fail_save: bool,
}

impl MemorySlotNameStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored table.
    #[must_use]
    pub fn with_names(names: &[&str]) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().names = Some(names.iter().map(|s| (*s).to_string()).collect());
        store
    }

    /// Make every `load()` fail.
    #[must_use]
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Make every `save()` fail.
    #[must_use]
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    /// The currently stored table.
    #[must_use]
    pub fn names(&self) -> Option<Vec<String>> {
        self.state.lock().unwrap().names.clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.state.lock().unwrap().saves
    }
}

impl SlotNameStore for MemorySlotNameStore {
    fn load(&self) -> Result<Option<Vec<String>>, StreamerError> {
        if self.fail_load {
            return Err(StreamerError::Persistence("load failed".to_string()));
        }
        Ok(self.names())
    }

    fn save(&self, names: &[String]) -> Result<(), StreamerError> {
        if self.fail_save {
            return Err(StreamerError::Persistence("save failed".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.names = Some(names.to_vec());
        state.saves += 1;
        Ok(())
    }
}
