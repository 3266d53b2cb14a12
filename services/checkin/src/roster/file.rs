//! Local roster cache in a JSON file.

use super::{RosterEntry, RosterSource};
use crate::error::RosterError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Roster persisted as a JSON array on local disk.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a failed write never leaves a truncated roster behind.
#[derive(Debug, Clone)]
pub struct FileRosterSource {
    path: PathBuf,
}

impl FileRosterSource {
    /// Cache at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RosterSource for FileRosterSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Vec<RosterEntry>, RosterError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Roster cache not found, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, entries: &[RosterEntry]) -> Result<(), RosterError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let temp = self.temp_path();
        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), RosterError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRosterSource::new(dir.path().join("members.json"));
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRosterSource::new(dir.path().join("nested").join("members.json"));
        let entries = vec![RosterEntry::new("Ada", "TC-1"), RosterEntry::new("Bob", "TC-2")];

        source.store(&entries).await.unwrap();
        assert_eq!(source.load().await.unwrap(), entries);
        assert!(!source.temp_path().exists());

        source.clear().await.unwrap();
        assert!(source.load().await.unwrap().is_empty());
        source.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.json");
        std::fs::write(&path, b"{not json").unwrap();
        let source = FileRosterSource::new(&path);
        assert!(matches!(source.load().await, Err(RosterError::Serialization(_))));
    }
}
