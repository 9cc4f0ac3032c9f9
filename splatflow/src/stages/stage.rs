//! The fixed pipeline stages and their ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SubmitError;

/// A stage of the reconstruction pipeline.
///
/// Stages form a fixed linear order: structure-from-motion, then
/// Gaussian-splat training, then compression. Each stage consumes the
/// artifact produced by its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Structure-from-motion: camera poses and a sparse reconstruction.
    Sfm,
    /// Gaussian-splat training over the sparse reconstruction.
    Train,
    /// Compression of the trained splat model.
    Compress,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 3] = [Self::Sfm, Self::Train, Self::Compress];

    /// The stage name used for output keys, logs, and payloads.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sfm => "sfm",
            Self::Train => "train",
            Self::Compress => "compress",
        }
    }

    /// The suffix appended to the run's job id when naming the remote job.
    #[must_use]
    pub fn job_suffix(&self) -> &'static str {
        match self {
            Self::Sfm => "sfm",
            Self::Train => "3dgs",
            Self::Compress => "compression",
        }
    }

    /// Zero-based position in pipeline order.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        match self {
            Self::Sfm => 0,
            Self::Train => 1,
            Self::Compress => 2,
        }
    }

    /// The stage after this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Sfm => Some(Self::Train),
            Self::Train => Some(Self::Compress),
            Self::Compress => None,
        }
    }

    /// The stage before this one, if any.
    #[must_use]
    pub fn prev(&self) -> Option<Self> {
        match self {
            Self::Sfm => None,
            Self::Train => Some(Self::Sfm),
            Self::Compress => Some(Self::Train),
        }
    }

    /// The first stage of the pipeline.
    #[must_use]
    pub fn first() -> Self {
        Self::Sfm
    }

    /// The final stage of the pipeline.
    #[must_use]
    pub fn last() -> Self {
        Self::Compress
    }

    /// The artifact kind this stage consumes.
    #[must_use]
    pub fn input_kind(&self) -> ArtifactKind {
        match self {
            Self::Sfm => ArtifactKind::Images,
            Self::Train => ArtifactKind::SparseReconstruction,
            Self::Compress => ArtifactKind::GaussianSplat,
        }
    }

    /// The artifact kind this stage produces.
    #[must_use]
    pub fn output_kind(&self) -> ArtifactKind {
        match self {
            Self::Sfm => ArtifactKind::SparseReconstruction,
            Self::Train => ArtifactKind::GaussianSplat,
            Self::Compress => ArtifactKind::CompressedSplat,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The kind of artifact a stage consumes or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A posed or unposed image set.
    Images,
    /// Camera poses plus a sparse point cloud.
    SparseReconstruction,
    /// A trained Gaussian-splat model.
    GaussianSplat,
    /// A compressed splat model ready for delivery.
    CompressedSplat,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Images => write!(f, "images"),
            Self::SparseReconstruction => write!(f, "sparse_reconstruction"),
            Self::GaussianSplat => write!(f, "gaussian_splat"),
            Self::CompressedSplat => write!(f, "compressed_splat"),
        }
    }
}

/// A validated, closed interval of pipeline stages.
///
/// A run executes exactly the stages from `start` through `stop_after`,
/// inclusive, in pipeline order. Construction fails when the interval is
/// reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWindow {
    start: Stage,
    stop_after: Stage,
}

impl StageWindow {
    /// Creates a window from `start` through `stop_after`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::InvalidStageWindow`] when `start` comes after
    /// `stop_after` in pipeline order.
    pub fn new(start: Stage, stop_after: Stage) -> Result<Self, SubmitError> {
        if start.ordinal() > stop_after.ordinal() {
            return Err(SubmitError::InvalidStageWindow { start, stop_after });
        }
        Ok(Self { start, stop_after })
    }

    /// The window covering the entire pipeline.
    #[must_use]
    pub fn full() -> Self {
        Self {
            start: Stage::first(),
            stop_after: Stage::last(),
        }
    }

    /// A window containing a single stage.
    #[must_use]
    pub fn single(stage: Stage) -> Self {
        Self {
            start: stage,
            stop_after: stage,
        }
    }

    /// The first stage of the window.
    #[must_use]
    pub fn start(&self) -> Stage {
        self.start
    }

    /// The last stage the run executes.
    #[must_use]
    pub fn stop_after(&self) -> Stage {
        self.stop_after
    }

    /// Returns true if `stage` falls within the window.
    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        self.start.ordinal() <= stage.ordinal() && stage.ordinal() <= self.stop_after.ordinal()
    }

    /// Returns true if the window runs through the final pipeline stage.
    #[must_use]
    pub fn ends_at_pipeline_end(&self) -> bool {
        self.stop_after == Stage::last()
    }

    /// The number of stages in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stop_after.ordinal() - self.start.ordinal() + 1
    }

    /// A window is never empty; provided for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the stages of the window in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> {
        let (start, stop) = (self.start.ordinal(), self.stop_after.ordinal());
        Stage::ALL
            .into_iter()
            .filter(move |s| start <= s.ordinal() && s.ordinal() <= stop)
    }
}

impl fmt::Display for StageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.stop_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Sfm.ordinal(), 0);
        assert_eq!(Stage::Train.ordinal(), 1);
        assert_eq!(Stage::Compress.ordinal(), 2);
        assert_eq!(Stage::Sfm.next(), Some(Stage::Train));
        assert_eq!(Stage::Compress.next(), None);
        assert_eq!(Stage::Sfm.prev(), None);
        assert_eq!(Stage::Compress.prev(), Some(Stage::Train));
    }

    #[test]
    fn test_stage_names_and_suffixes() {
        assert_eq!(Stage::Sfm.name(), "sfm");
        assert_eq!(Stage::Train.name(), "train");
        assert_eq!(Stage::Compress.name(), "compress");
        assert_eq!(Stage::Sfm.job_suffix(), "sfm");
        assert_eq!(Stage::Train.job_suffix(), "3dgs");
        assert_eq!(Stage::Compress.job_suffix(), "compression");
    }

    #[test]
    fn test_stage_serialize() {
        let json = serde_json::to_string(&Stage::Train).unwrap();
        assert_eq!(json, r#""train""#);

        let deserialized: Stage = serde_json::from_str(r#""compress""#).unwrap();
        assert_eq!(deserialized, Stage::Compress);
    }

    #[test]
    fn test_artifact_chain_lines_up() {
        for stage in Stage::ALL {
            if let Some(next) = stage.next() {
                assert_eq!(stage.output_kind(), next.input_kind());
            }
        }
    }

    #[test]
    fn test_window_iteration_is_exact() {
        let window = StageWindow::new(Stage::Sfm, Stage::Train).unwrap();
        let stages: Vec<Stage> = window.iter().collect();
        assert_eq!(stages, vec![Stage::Sfm, Stage::Train]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_window_single() {
        let window = StageWindow::single(Stage::Compress);
        let stages: Vec<Stage> = window.iter().collect();
        assert_eq!(stages, vec![Stage::Compress]);
        assert!(window.ends_at_pipeline_end());
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let err = StageWindow::new(Stage::Compress, Stage::Sfm).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidStageWindow { .. }));
    }

    #[test]
    fn test_window_contains() {
        let window = StageWindow::full();
        for stage in Stage::ALL {
            assert!(window.contains(stage));
        }
        let tail = StageWindow::new(Stage::Train, Stage::Compress).unwrap();
        assert!(!tail.contains(Stage::Sfm));
    }

    #[test]
    fn test_all_windows_are_closed_intervals() {
        for start in Stage::ALL {
            for stop in Stage::ALL {
                if start.ordinal() > stop.ordinal() {
                    assert!(StageWindow::new(start, stop).is_err());
                    continue;
                }
                let window = StageWindow::new(start, stop).unwrap();
                let stages: Vec<Stage> = window.iter().collect();
                assert_eq!(stages.len(), stop.ordinal() - start.ordinal() + 1);
                assert_eq!(stages.first().copied(), Some(start));
                assert_eq!(stages.last().copied(), Some(stop));
            }
        }
    }
}
