//! Stage outcome types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::StageFailure;
use crate::store::{Location, StageMetadata};

use super::stage::Stage;

/// Terminal status of one stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage produced its output artifact.
    Succeeded,
    /// The stage did not produce its output artifact.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The outcome of running one stage to completion.
///
/// Success carries the verified output location; failure carries the
/// [`StageFailure`] that stopped the stage. Wall-clock duration is recorded
/// on both paths.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    /// The stage that ran.
    pub stage: Stage,
    /// Terminal status.
    pub status: StageStatus,
    /// Verified output location, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Location>,
    /// The failure that ended the stage, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    /// Stage metadata document, attached best-effort after success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StageMetadata>,
    /// Wall-clock time from first launch attempt to terminal status.
    pub duration: Duration,
}

impl StageResult {
    /// Creates a successful result with a verified output location.
    #[must_use]
    pub fn succeeded(stage: Stage, output: Location, duration: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Succeeded,
            output: Some(output),
            failure: None,
            metadata: None,
            duration,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(stage: Stage, failure: StageFailure, duration: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            output: None,
            failure: Some(failure),
            metadata: None,
            duration,
        }
    }

    /// Attaches the stage metadata document.
    #[must_use]
    pub fn with_metadata(mut self, metadata: StageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Succeeded
    }
}
