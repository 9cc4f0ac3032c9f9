//! The execution context threaded through a run.

use serde::Serialize;
use std::fmt;

use crate::errors::{OutputConflictError, SubmitError};
use crate::stages::{Stage, StageWindow};
use crate::store::{Location, RunLayout};

use super::env::{EnvMap, HyperparameterMap};
use super::identity::JobId;
use super::outputs::StageOutputs;
use super::request::PipelineRequest;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, nothing launched yet.
    Pending,
    /// A stage is in flight.
    Running(Stage),
    /// Every stage through the end of the pipeline succeeded.
    Succeeded,
    /// The run stopped early, as requested, with every executed stage
    /// succeeding.
    PartiallySucceeded,
    /// A stage failed or the run was cancelled.
    Failed,
}

impl RunStatus {
    /// Returns true for terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallySucceeded | Self::Failed)
    }

    /// Returns true for the success-class terminal states.
    ///
    /// An early stop is a success, not a failure: it reports through the
    /// same path as a full completion.
    #[must_use]
    pub fn is_success_class(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallySucceeded)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running(stage) => write!(f, "running:{stage}"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::PartiallySucceeded => write!(f, "partially_succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The single record threaded through one run.
///
/// Built by validating a [`PipelineRequest`]; nothing launches for an
/// invalid request. The environment is frozen at construction, outputs are
/// write-once, and the configured stage window never changes mid-run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    job_id: JobId,
    requester_email: String,
    input_location: Location,
    layout: RunLayout,
    window: StageWindow,
    environment: EnvMap,
    hyperparameters: HyperparameterMap,
    outputs: StageOutputs,
    status: RunStatus,
}

impl PipelineContext {
    /// Validates a request into a run context.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] when the stage window is reversed, the
    /// job id cannot form valid job names, or required fields are missing
    /// or malformed.
    pub fn from_request(request: PipelineRequest) -> Result<Self, SubmitError> {
        let job_id = match request.job_id {
            Some(raw) => JobId::parse(raw)?,
            None => JobId::generate(),
        };

        let email = request.requester_email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(SubmitError::invalid_request(format!(
                "requester email '{email}' is not an address"
            )));
        }

        if request.input_location.as_str().trim().is_empty() {
            return Err(SubmitError::invalid_request("input location is empty"));
        }

        let window = StageWindow::new(
            request.start_stage.unwrap_or_else(Stage::first),
            request.stop_after_stage.unwrap_or_else(Stage::last),
        )?;

        let output_root = request
            .output_root
            .unwrap_or_else(|| request.input_location.join("outputs"));
        let layout = RunLayout::new(&output_root, job_id.as_str());

        Ok(Self {
            job_id,
            requester_email: email.to_string(),
            input_location: request.input_location,
            layout,
            window,
            environment: EnvMap::from(request.environment),
            hyperparameters: HyperparameterMap::from(request.hyperparameters),
            outputs: StageOutputs::new(),
            status: RunStatus::Pending,
        })
    }

    /// The run's id.
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Who gets the terminal notification.
    #[must_use]
    pub fn requester_email(&self) -> &str {
        &self.requester_email
    }

    /// Where the first executed stage reads its input.
    #[must_use]
    pub fn input_location(&self) -> &Location {
        &self.input_location
    }

    /// The run's storage layout.
    #[must_use]
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// The configured stage window.
    #[must_use]
    pub fn window(&self) -> StageWindow {
        self.window
    }

    /// The frozen launch environment.
    #[must_use]
    pub fn environment(&self) -> &EnvMap {
        &self.environment
    }

    /// The run's hyperparameters.
    #[must_use]
    pub fn hyperparameters(&self) -> &HyperparameterMap {
        &self.hyperparameters
    }

    /// The outputs recorded so far.
    #[must_use]
    pub fn outputs(&self) -> &StageOutputs {
        &self.outputs
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Moves the run to a new lifecycle status.
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Records a stage's verified output.
    ///
    /// # Errors
    ///
    /// Returns [`OutputConflictError`] when the stage already recorded one.
    pub fn record_output(
        &mut self,
        stage: Stage,
        location: Location,
    ) -> Result<(), OutputConflictError> {
        self.outputs.record(stage, location)
    }

    /// Resolves where `stage` reads its input.
    ///
    /// The first stage of the window reads the request's input location;
    /// every later stage reads its predecessor's recorded output. `None`
    /// means the handoff contract cannot be satisfied.
    #[must_use]
    pub fn stage_input(&self, stage: Stage) -> Option<Location> {
        if stage == self.window.start() {
            return Some(self.input_location.clone());
        }
        stage
            .prev()
            .and_then(|prev| self.outputs.get(prev))
            .cloned()
    }
}
