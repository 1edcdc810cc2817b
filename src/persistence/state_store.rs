//! Persisted engine state (the starvation counter).
//!
//! A tiny JSON file under the data directory. Missing or unreadable
//! state is treated as a fresh counter, never as an error.

use crate::domain::EngineState;
use crate::error::{PhasegateError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// State file name under the data directory.
pub const STATE_FILE: &str = "loop_state.json";

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state; default on any failure.
    pub fn load(&self) -> EngineState {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    debug!("corrupt state file {}: {}", self.path.display(), e);
                    EngineState::default()
                }
            },
            Err(_) => EngineState::default(),
        }
    }

    /// Persist the state for the next invocation.
    pub fn store(&self, state: &EngineState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PhasegateError::StateStore(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string(state)?;
        std::fs::write(&self.path, json)
            .map_err(|e| PhasegateError::StateStore(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;

    fn temp_store(name: &str) -> StateStore {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        StateStore::new(&dir)
    }

    #[test]
    fn test_missing_file_is_fresh_state() {
        let store = StateStore::new(Path::new("/nonexistent-dir"));
        assert_eq!(store.load(), EngineState::default());
    }

    #[test]
    fn test_round_trip() {
        let store = temp_store("phasegate_state_round_trip");
        let state = EngineState {
            starve_cnt: 7,
            last_strong: false,
        };
        store.store(&state).unwrap();
        assert_eq!(store.load(), state);
        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_corrupt_file_is_fresh_state() {
        let store = temp_store("phasegate_state_corrupt");
        std::fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), EngineState::default());
        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn test_successive_cycles() {
        let store = temp_store("phasegate_state_cycles");
        let mut state = store.load();
        for _ in 0..3 {
            state = state.after(Signal::Watch);
            store.store(&state).unwrap();
        }
        assert_eq!(store.load().starve_cnt, 3);

        state = state.after(Signal::Sell);
        store.store(&state).unwrap();
        assert_eq!(store.load().starve_cnt, 0);
        std::fs::remove_file(store.path()).ok();
    }
}
