// Console Selection State
// The one piece of cross-view state: which client is currently selected.
// An explicit, typed store with explicit setter/getter and an explicit
// serialization boundary (a JSON file), instead of ambient module-level
// mutable state with implicit cross-component subscription.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleState {
    selected_client_id: Option<String>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_client(&self) -> Option<&str> {
        self.selected_client_id.as_deref()
    }

    pub fn select_client(&mut self, client_id: impl Into<String>) {
        self.selected_client_id = Some(client_id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_client_id = None;
    }

    /// Load persisted state; a missing file is a fresh state, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {:?}", path))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {:?}", path))?;

        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).with_context(|| format!("Failed to write state file {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_clear() {
        let mut state = ConsoleState::new();
        assert!(state.selected_client().is_none());

        state.select_client("client-1");
        assert_eq!(state.selected_client(), Some("client-1"));

        state.select_client("client-2");
        assert_eq!(state.selected_client(), Some("client-2"));

        state.clear_selection();
        assert!(state.selected_client().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("console-state-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        let mut state = ConsoleState::new();
        state.select_client("client-7");
        state.save(&path).unwrap();

        let loaded = ConsoleState::load(&path).unwrap();
        assert_eq!(loaded, state);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", uuid::Uuid::new_v4()));
        let state = ConsoleState::load(&path).unwrap();
        assert_eq!(state, ConsoleState::default());
    }
}
