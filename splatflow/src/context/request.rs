//! The pipeline submission request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stages::Stage;
use crate::store::Location;

/// A pipeline submission, as produced by the external API or CLI.
///
/// Optional fields have defaults: a fresh job id, the full stage window,
/// and an output root beside the input. The request is plain data; all
/// validation happens when it is turned into a
/// [`PipelineContext`](super::PipelineContext).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    /// Caller-chosen run id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Who to notify when the run reaches a terminal state.
    pub requester_email: String,
    /// Where the first executed stage reads its input.
    pub input_location: Location,
    /// Root under which run artifacts are laid out; defaults to
    /// `{input_location}/outputs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<Location>,
    /// First stage to execute; defaults to the start of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_stage: Option<Stage>,
    /// Last stage to execute; defaults to the end of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_after_stage: Option<Stage>,
    /// Environment variables attached verbatim to every stage launch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Per-stage hyperparameters, passed through without interpretation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hyperparameters: BTreeMap<Stage, BTreeMap<String, serde_json::Value>>,
}

impl PipelineRequest {
    /// Creates a minimal request for the full pipeline.
    #[must_use]
    pub fn new(requester_email: impl Into<String>, input_location: impl Into<Location>) -> Self {
        Self {
            job_id: None,
            requester_email: requester_email.into(),
            input_location: input_location.into(),
            output_root: None,
            start_stage: None,
            stop_after_stage: None,
            environment: BTreeMap::new(),
            hyperparameters: BTreeMap::new(),
        }
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<Location>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    /// Sets the stage window.
    #[must_use]
    pub fn with_window(mut self, start: Stage, stop_after: Stage) -> Self {
        self.start_stage = Some(start);
        self.stop_after_stage = Some(stop_after);
        self
    }

    /// Sets the last stage to execute.
    #[must_use]
    pub fn with_stop_after(mut self, stop_after: Stage) -> Self {
        self.stop_after_stage = Some(stop_after);
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Adds one hyperparameter for a stage.
    #[must_use]
    pub fn with_hyperparameter(
        mut self,
        stage: Stage,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.hyperparameters
            .entry(stage)
            .or_default()
            .insert(key.into(), value);
        self
    }
}
