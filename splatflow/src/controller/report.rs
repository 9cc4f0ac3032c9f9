//! The terminal report of one pipeline run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::context::RunStatus;
use crate::errors::StageFailure;
use crate::stages::{Stage, StageResult};
use crate::store::Location;

/// Everything a caller learns about a finished run.
///
/// Stage results are in execution order, so the last entry of a failed run
/// is the stage that stopped it. Outputs appear only for stages whose
/// artifacts were verified.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// The run's id.
    pub job_id: String,
    /// Terminal status.
    pub status: RunStatus,
    /// Per-stage results, in execution order.
    pub stage_results: Vec<StageResult>,
    /// Verified output of every stage that succeeded.
    pub stage_outputs: BTreeMap<Stage, Location>,
    /// Wall-clock time from acceptance to terminal status.
    pub duration: Duration,
}

impl RunReport {
    /// Returns true for the success-class terminal states.
    #[must_use]
    pub fn is_success_class(&self) -> bool {
        self.status.is_success_class()
    }

    /// The result recorded for `stage`, if it ran.
    #[must_use]
    pub fn result_for(&self, stage: Stage) -> Option<&StageResult> {
        self.stage_results.iter().find(|result| result.stage == stage)
    }

    /// The stage whose failure ended the run, if any.
    #[must_use]
    pub fn failing_stage(&self) -> Option<Stage> {
        self.stage_results
            .iter()
            .find(|result| !result.is_success())
            .map(|result| result.stage)
    }

    /// The failure that ended the run, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&StageFailure> {
        self.stage_results
            .iter()
            .find_map(|result| result.failure.as_ref())
    }
}
