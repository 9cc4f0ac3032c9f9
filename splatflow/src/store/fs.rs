//! Filesystem-backed artifact store.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::errors::StoreError;

use super::location::Location;
use super::ArtifactStore;

/// Artifact store over a local directory, for development deployments.
///
/// Locations are interpreted as relative paths under the store root.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a location to a path under the root.
    ///
    /// Rejects absolute locations and parent-directory segments, which
    /// would escape the root.
    fn resolve(&self, location: &Location) -> Result<PathBuf, StoreError> {
        let relative = Path::new(location.as_str());
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if escapes {
            return Err(StoreError::unavailable(format!(
                "location '{location}' escapes the store root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn map_io(location: &Location, err: &std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::not_found(location.clone())
    } else {
        StoreError::unavailable(err.to_string())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write(&self, location: &Location, payload: Vec<u8>) -> Result<(), StoreError> {
        let path = self.resolve(location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::unavailable(e.to_string()))?;
        }
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }

    async fn read(&self, location: &Location) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(location)?;
        tokio::fs::read(&path).await.map_err(|e| map_io(location, &e))
    }

    async fn exists(&self, location: &Location) -> Result<bool, StoreError> {
        let path = self.resolve(location)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let location = Location::new("abc123/sfm/output");

        store.write(&location, b"cameras".to_vec()).await.unwrap();
        assert!(store.exists(&location).await.unwrap());
        assert_eq!(store.read(&location).await.unwrap(), b"cameras");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let location = Location::new("abc123/train/output");

        assert!(!store.exists(&location).await.unwrap());
        let err = store.read(&location).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_escaping_locations_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let err = store.read(&Location::new("../outside")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
