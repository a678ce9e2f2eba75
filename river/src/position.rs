//! The durable position store (SPEC_FULL §4.9): persists a
//! [`ReplicationPosition`] as a small JSON file, written atomically so a
//! crash mid-write cannot corrupt the last-known-good position.

use std::path::PathBuf;

use async_trait::async_trait;
use river_errors::{RiverError, RiverResult};
use river_sync::{PositionStore, ReplicationPosition};

/// Persists the replication position to `path` via write-to-temp-then-
/// rename, the common durable-save idiom.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }
}

#[async_trait]
impl PositionStore for FileStore {
    async fn load(&self) -> RiverResult<Option<ReplicationPosition>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RiverError::Persist(format!("reading position file: {e}"))),
        };
        let position = serde_json::from_str(&text)
            .map_err(|e| RiverError::Persist(format!("parsing position file: {e}")))?;
        Ok(Some(position))
    }

    async fn save(&self, position: &ReplicationPosition) -> RiverResult<()> {
        let text = serde_json::to_string(position)
            .map_err(|e| RiverError::Persist(format!("serializing position: {e}")))?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, text)
            .await
            .map_err(|e| RiverError::Persist(format!("writing position temp file: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| RiverError::Persist(format!("renaming position file into place: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let path = std::env::temp_dir().join("river-position-test-missing/position.json");
        let store = FileStore::new(path);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_position_round_trips() {
        let dir = std::env::temp_dir().join("river-position-test-round-trip");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let store = FileStore::new(dir.join("position.json"));

        let position = ReplicationPosition::new("mysql-bin.000007", 914);
        store.save(&position).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(position));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
