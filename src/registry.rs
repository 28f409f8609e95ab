//! Acknowledged position registry
//!
//! Holds the last acknowledged [`State`] per source. Only acknowledgments
//! update it, so a harvester resuming from the registry never skips events
//! the sink did not confirm.

use crate::error::OutletError;
use crate::events::State;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Concurrent map of source → acknowledged state
#[derive(Debug, Default)]
pub struct Registry {
    states: DashMap<String, State>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acknowledged state. Positions never move backwards.
    pub fn update(&self, state: &State) {
        self.states
            .entry(state.source.clone())
            .and_modify(|current| {
                if state.offset >= current.offset {
                    *current = state.clone();
                }
            })
            .or_insert_with(|| state.clone());
    }

    pub fn get(&self, source: &str) -> Option<State> {
        self.states.get(source).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// All states, sorted by source
    pub fn snapshot(&self) -> Vec<State> {
        let mut states: Vec<State> = self.states.iter().map(|e| e.value().clone()).collect();
        states.sort_by(|a, b| a.source.cmp(&b.source));
        states
    }

    /// Load a registry file. A missing file yields an empty registry.
    pub async fn load(path: &Path) -> Result<Self, OutletError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No registry file, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(OutletError::Registry {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let states: Vec<State> =
            serde_json::from_slice(&content).map_err(OutletError::SerializationFailed)?;

        let registry = Self::new();
        for state in &states {
            registry.update(state);
        }

        info!(path = %path.display(), sources = registry.len(), "Registry loaded");
        Ok(registry)
    }

    /// Write the registry to `path` through a temporary file and rename
    pub async fn flush(&self, path: &Path) -> Result<(), OutletError> {
        let io_err = |source: std::io::Error| OutletError::Registry {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let content =
            serde_json::to_vec_pretty(&self.snapshot()).map_err(OutletError::SerializationFailed)?;

        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        debug!(path = %path.display(), sources = self.len(), "Registry flushed");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("harvest-outlet-{}", uuid::Uuid::new_v4()))
            .join("registry.json")
    }

    #[test]
    fn update_keeps_latest_offset() {
        let registry = Registry::new();
        registry.update(&State::new("a.log", 10));
        registry.update(&State::new("a.log", 25));
        registry.update(&State::new("b.log", 3));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a.log").unwrap().offset, 25);
        assert_eq!(registry.get("b.log").unwrap().offset, 3);
    }

    #[test]
    fn update_never_moves_backwards() {
        let registry = Registry::new();
        registry.update(&State::new("a.log", 40));
        registry.update(&State::new("a.log", 12));

        assert_eq!(registry.get("a.log").unwrap().offset, 40);
    }

    #[test]
    fn snapshot_is_sorted_by_source() {
        let registry = Registry::new();
        registry.update(&State::new("c.log", 1));
        registry.update(&State::new("a.log", 1));
        registry.update(&State::new("b.log", 1));

        let sources: Vec<_> = registry.snapshot().into_iter().map(|s| s.source).collect();
        assert_eq!(sources, ["a.log", "b.log", "c.log"]);
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let registry = Registry::load(&scratch_path()).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn flush_then_load_restores_positions() {
        let path = scratch_path();

        let registry = Registry::new();
        registry.update(&State::new("/var/log/app.log", 4096));
        registry.flush(&path).await.unwrap();

        assert!(!tmp_path(&path).exists());

        let restored = Registry::load(&path).await.unwrap();
        assert_eq!(restored.get("/var/log/app.log").unwrap().offset, 4096);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn load_rejects_corrupt_file() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let err = Registry::load(&path).await.unwrap_err();
        assert_eq!(err.error_type_label(), "serialization");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
