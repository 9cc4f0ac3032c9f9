//! The per-stage metadata document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stages::Stage;

/// The small document a stage body writes next to its primary output.
///
/// Read by the orchestrator after a successful stage, independently of the
/// primary artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    /// The stage that produced the document.
    pub stage: Stage,
    /// The stage body's own status claim (e.g. `"succeeded"`).
    pub status: String,
    /// When the stage body finished writing its output.
    pub produced_at: DateTime<Utc>,
    /// Quality metrics (e.g. PSNR, gaussian count).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quality: BTreeMap<String, f64>,
    /// Provenance flags (tool versions, codec names).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provenance: BTreeMap<String, String>,
}

impl StageMetadata {
    /// Creates a new metadata document stamped with the current time.
    #[must_use]
    pub fn new(stage: Stage, status: impl Into<String>) -> Self {
        Self {
            stage,
            status: status.into(),
            produced_at: Utc::now(),
            quality: BTreeMap::new(),
            provenance: BTreeMap::new(),
        }
    }

    /// Adds a quality metric.
    #[must_use]
    pub fn with_quality(mut self, key: impl Into<String>, value: f64) -> Self {
        self.quality.insert(key.into(), value);
        self
    }

    /// Adds a provenance entry.
    #[must_use]
    pub fn with_provenance(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.provenance.insert(key.into(), value.into());
        self
    }

    /// Serializes the document to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parses a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` on malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let metadata = StageMetadata::new(Stage::Train, "succeeded")
            .with_quality("psnr", 31.4)
            .with_quality("gaussians", 1_250_000.0)
            .with_provenance("trainer", "gsplat-0.3");

        let bytes = metadata.to_bytes().unwrap();
        let back = StageMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_empty_maps_are_omitted() {
        let metadata = StageMetadata::new(Stage::Sfm, "succeeded");
        let json: serde_json::Value =
            serde_json::from_slice(&metadata.to_bytes().unwrap()).unwrap();
        assert!(json.get("quality").is_none());
        assert!(json.get("provenance").is_none());
    }

    #[test]
    fn test_malformed_bytes_are_rejected() {
        assert!(StageMetadata::from_bytes(b"not json").is_err());
    }
}
