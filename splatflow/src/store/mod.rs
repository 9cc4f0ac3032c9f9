//! Artifact storage: locations, the store seam, and the per-run layout.
//!
//! Stages hand data to each other exclusively through [`Location`]s in an
//! [`ArtifactStore`]. The orchestrator never moves artifact bytes between
//! stages; it verifies presence and reads only the small per-stage
//! [`StageMetadata`] document.

use async_trait::async_trait;

use crate::errors::StoreError;

mod fs;
mod layout;
mod location;
mod memory;
mod metadata;

pub use fs::FsArtifactStore;
pub use layout::RunLayout;
pub use location::Location;
pub use memory::InMemoryArtifactStore;
pub use metadata::StageMetadata;

/// The storage seam between the orchestrator and whatever holds artifacts.
///
/// Implementations must be safe to share across concurrent runs. Transient
/// faults are reported as [`StoreError::Unavailable`] so callers can retry;
/// a definite absence is [`StoreError::NotFound`] (for reads) or
/// `Ok(false)` (for existence checks).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `payload` at `location`, overwriting any previous object.
    async fn write(&self, location: &Location, payload: Vec<u8>) -> Result<(), StoreError>;

    /// Reads the object at `location`.
    async fn read(&self, location: &Location) -> Result<Vec<u8>, StoreError>;

    /// Reports whether an object exists at `location`.
    async fn exists(&self, location: &Location) -> Result<bool, StoreError>;
}
