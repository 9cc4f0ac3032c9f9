//! Write-once stage output map.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::OutputConflictError;
use crate::stages::Stage;
use crate::store::Location;

/// The verified output locations a run has accumulated, keyed by stage.
///
/// Entries are write-once: recording a stage that already has an output is
/// an [`OutputConflictError`]. There is no overwrite path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageOutputs {
    entries: BTreeMap<Stage, Location>,
}

impl StageOutputs {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stage's verified output location.
    ///
    /// # Errors
    ///
    /// Returns [`OutputConflictError`] when the stage already has an output.
    pub fn record(&mut self, stage: Stage, location: Location) -> Result<(), OutputConflictError> {
        if self.entries.contains_key(&stage) {
            return Err(OutputConflictError::new(stage));
        }
        self.entries.insert(stage, location);
        Ok(())
    }

    /// The recorded output for a stage, if any.
    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<&Location> {
        self.entries.get(&stage)
    }

    /// Returns true if the stage has a recorded output.
    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        self.entries.contains_key(&stage)
    }

    /// Iterates recorded outputs in stage order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &Location)> {
        self.entries.iter().map(|(stage, location)| (*stage, location))
    }

    /// Number of recorded outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A plain map copy for reports and payloads.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<Stage, Location> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let mut outputs = StageOutputs::new();
        outputs
            .record(Stage::Sfm, Location::new("runs/abc/sfm/output"))
            .unwrap();

        assert!(outputs.contains(Stage::Sfm));
        assert_eq!(
            outputs.get(Stage::Sfm).map(Location::as_str),
            Some("runs/abc/sfm/output")
        );
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_double_record_is_a_conflict() {
        let mut outputs = StageOutputs::new();
        outputs
            .record(Stage::Sfm, Location::new("first"))
            .unwrap();
        let err = outputs
            .record(Stage::Sfm, Location::new("second"))
            .unwrap_err();

        assert_eq!(err.stage, Stage::Sfm);
        // First write is preserved.
        assert_eq!(outputs.get(Stage::Sfm).map(Location::as_str), Some("first"));
    }

    #[test]
    fn test_iteration_follows_stage_order() {
        let mut outputs = StageOutputs::new();
        outputs.record(Stage::Train, Location::new("t")).unwrap();
        outputs.record(Stage::Sfm, Location::new("s")).unwrap();

        let stages: Vec<Stage> = outputs.iter().map(|(stage, _)| stage).collect();
        assert_eq!(stages, vec![Stage::Sfm, Stage::Train]);
    }
}
