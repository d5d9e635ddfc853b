//! On-disk snapshot of the last successfully extracted event list.
//!
//! The whole list is the unit of persistence: every save replaces the file,
//! and a missing or unreadable file reads back as an empty history.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::types::Event;

pub const DEFAULT_SNAPSHOT_PATH: &str = "events_data.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the previous snapshot. Never fails.
    pub async fn load(&self) -> Vec<Event> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No snapshot at {:?}, starting fresh", self.path);
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Could not read {:?}: {}, starting fresh", self.path, e);
                return Vec::new();
            }
        };

        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            log::warn!("Could not decode {:?}: {}, starting fresh", self.path, e);
            Vec::new()
        })
    }

    /// Replaces the snapshot (write to a temporary sibling, then rename).
    pub async fn save(&self, events: &[Event]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(events)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(&bytes).await.map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        log::info!("Saved {} events to {:?}", events.len(), self.path);
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(title: &str) -> Event {
        Event::new(
            title.to_string(),
            "1 January 2026".to_string(),
            "Description".to_string(),
            "https://omswami.org/events".to_string(),
        )
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path().join("events_data.json"));

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events_data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = EventStore::new(&path);

        assert!(store.load().await.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path().join("events_data.json"));
        let events = vec![make_event("Satsang"), make_event("Meditation Retreat")];

        store.save(&events).await.unwrap();

        assert_eq!(store.load().await, events);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_is_rewritten_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path().join("events_data.json"));
        store.save(&[make_event("Satsang")]).await.unwrap();
        let first = std::fs::read(store.path()).unwrap();

        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();

        assert_eq!(std::fs::read(store.path()).unwrap(), first);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path().join("nested/events_data.json"));

        store
            .save(&[make_event("Satsang"), make_event("Holi")])
            .await
            .unwrap();
        store.save(&[make_event("Diwali")]).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Diwali");
        assert!(!dir.path().join("nested/events_data.json.tmp").exists());
    }
}
