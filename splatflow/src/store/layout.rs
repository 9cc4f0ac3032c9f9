//! Deterministic per-run storage layout.

use crate::stages::Stage;

use super::location::Location;

/// The fixed location scheme for one run's artifacts.
///
/// Everything a run produces lives under `{output_root}/{job_id}`; each
/// stage gets a directory holding its primary output and its metadata
/// document. Deterministic locations are what make launches reproducible
/// and outputs verifiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: Location,
}

impl RunLayout {
    /// Creates the layout for a run.
    #[must_use]
    pub fn new(output_root: &Location, job_id: &str) -> Self {
        Self {
            root: output_root.join(job_id),
        }
    }

    /// The run's root location.
    #[must_use]
    pub fn run_root(&self) -> &Location {
        &self.root
    }

    /// Where a stage must write its primary output.
    #[must_use]
    pub fn stage_output(&self, stage: Stage) -> Location {
        self.root.join(stage.name()).join("output")
    }

    /// Where a stage must write its metadata document.
    #[must_use]
    pub fn stage_metadata(&self, stage: Stage) -> Location {
        self.root.join(stage.name()).join("metadata.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_deterministic() {
        let root = Location::new("buckets/assets");
        let layout = RunLayout::new(&root, "abc123");

        assert_eq!(layout.run_root().as_str(), "buckets/assets/abc123");
        assert_eq!(
            layout.stage_output(Stage::Sfm).as_str(),
            "buckets/assets/abc123/sfm/output"
        );
        assert_eq!(
            layout.stage_metadata(Stage::Train).as_str(),
            "buckets/assets/abc123/train/metadata.json"
        );
    }

    #[test]
    fn test_stage_locations_are_distinct() {
        let layout = RunLayout::new(&Location::new("root"), "job");
        let mut locations = Vec::new();
        for stage in Stage::ALL {
            locations.push(layout.stage_output(stage));
            locations.push(layout.stage_metadata(stage));
        }
        let unique: std::collections::HashSet<_> = locations.iter().collect();
        assert_eq!(unique.len(), locations.len());
    }
}
