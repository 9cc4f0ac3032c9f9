//! In-memory artifact store.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::errors::StoreError;

use super::location::Location;
use super::ArtifactStore;

/// Process-local artifact store for tests and development.
///
/// Reads and existence checks can be made to fail transiently with
/// [`InMemoryArtifactStore::fail_next_reads`], which is how verification
/// retry behavior gets exercised.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    objects: DashMap<String, Vec<u8>>,
    read_faults: Mutex<usize>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without going through the async interface.
    pub fn insert(&self, location: &Location, bytes: impl Into<Vec<u8>>) {
        self.objects.insert(location.as_str().to_string(), bytes.into());
    }

    /// Returns true if an object exists, bypassing fault injection.
    #[must_use]
    pub fn contains(&self, location: &Location) -> bool {
        self.objects.contains_key(location.as_str())
    }

    /// Makes the next `count` reads or existence checks fail as
    /// [`StoreError::Unavailable`].
    pub fn fail_next_reads(&self, count: usize) {
        *self.read_faults.lock() = count;
    }

    fn take_fault(&self) -> bool {
        let mut faults = self.read_faults.lock();
        if *faults > 0 {
            *faults -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn write(&self, location: &Location, payload: Vec<u8>) -> Result<(), StoreError> {
        self.objects.insert(location.as_str().to_string(), payload);
        Ok(())
    }

    async fn read(&self, location: &Location) -> Result<Vec<u8>, StoreError> {
        if self.take_fault() {
            return Err(StoreError::unavailable("injected fault"));
        }
        self.objects
            .get(location.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(location.clone()))
    }

    async fn exists(&self, location: &Location) -> Result<bool, StoreError> {
        if self.take_fault() {
            return Err(StoreError::unavailable("injected fault"));
        }
        Ok(self.objects.contains_key(location.as_str()))
    }
}
