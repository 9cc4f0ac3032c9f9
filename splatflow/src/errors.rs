//! Error types for the splatflow orchestrator.
//!
//! One taxonomy module: request rejection ([`SubmitError`]), stage-level
//! failures ([`StageFailure`]), and the errors of the backend, store, and
//! notification seams. Stage failures are data, not panics: they travel in
//! results and notification payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::stages::Stage;
use crate::store::Location;

/// A machine-readable failure cause reported by the compute backend.
///
/// Captured verbatim and propagated into results and notification payloads
/// without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// Short machine-readable code (e.g. `"OOM"`).
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl FailureCause {
    /// Creates a new failure cause.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Error raised when a job name or name root fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameError {
    /// The name is empty.
    #[error("Job name is empty")]
    Empty,

    /// The name exceeds the backend's length limit.
    #[error("Job name '{name}' exceeds {max} characters")]
    TooLong {
        /// The offending name.
        name: String,
        /// The applicable limit.
        max: usize,
    },

    /// The name contains characters outside the allowed charset.
    #[error("Job name '{name}' must be lowercase alphanumeric with interior hyphens")]
    InvalidCharset {
        /// The offending name.
        name: String,
    },
}

/// Errors returned by a [`JobLauncher`](crate::launcher::JobLauncher).
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchError {
    /// A different job already holds the requested name.
    #[error("A job named '{job_name}' already exists")]
    AlreadyExists {
        /// The contested name.
        job_name: String,
    },

    /// The backend refused the launch (quota, malformed config).
    #[error("Launch rejected: {reason}")]
    Rejected {
        /// The backend's stated reason.
        reason: String,
    },

    /// The derived job name failed validation.
    #[error("{0}")]
    InvalidName(#[from] NameError),

    /// Transport-level failure talking to the backend.
    #[error("Backend unreachable: {message}")]
    Backend {
        /// Transport error detail.
        message: String,
    },
}

impl LaunchError {
    /// Creates a rejected-launch error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Creates a transport-level backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if a retry of the same launch could succeed.
    ///
    /// Only transport failures qualify; rejections and name conflicts are
    /// deterministic.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Errors returned by an [`ArtifactStore`](crate::store::ArtifactStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No artifact exists at the location.
    #[error("No artifact at '{location}'")]
    NotFound {
        /// The missing location.
        location: Location,
    },

    /// The store could not be reached or answered with a transient fault.
    #[error("Artifact store unavailable: {reason}")]
    Unavailable {
        /// Fault detail.
        reason: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(location: Location) -> Self {
        Self::NotFound { location }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns true if a retry of the same operation could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Error raised when recording a second output for the same stage.
#[derive(Debug, Clone, Error)]
#[error("Output for stage '{stage}' already recorded")]
pub struct OutputConflictError {
    /// The stage with an existing output.
    pub stage: Stage,
}

impl OutputConflictError {
    /// Creates a new output conflict error.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }
}

/// Error returned by a [`NotificationSink`](crate::notify::NotificationSink).
#[derive(Debug, Clone, Error)]
#[error("Notification delivery failed: {message}")]
pub struct NotifyError {
    /// Delivery failure detail.
    pub message: String,
}

impl NotifyError {
    /// Creates a new notification error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The terminal failure of a single stage.
///
/// Exactly one of these ends every failed stage; the controller copies it
/// into the run report and the notification payload.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFailure {
    /// The stage's required input does not exist.
    #[error("Stage '{stage}' precondition failed: no input at '{location}'")]
    PreconditionFailed {
        /// The stage whose input is missing.
        stage: Stage,
        /// Where the input was expected.
        location: Location,
    },

    /// The remote job could not be launched.
    #[error("{0}")]
    Launch(#[from] LaunchError),

    /// The stage exceeded its wall-clock budget.
    #[error("Stage '{stage}' exceeded its {}s budget", budget.as_secs())]
    Timeout {
        /// The stage that timed out.
        stage: Stage,
        /// The configured budget.
        budget: Duration,
    },

    /// The backend reported success but the declared output is absent.
    #[error("Declared output missing at '{location}'")]
    MissingOutput {
        /// The empty output location.
        location: Location,
    },

    /// Output verification retries against the store were exhausted.
    #[error("Artifact store unavailable during verification: {reason}")]
    StoreUnavailable {
        /// Last observed fault.
        reason: String,
    },

    /// The remote job itself failed.
    #[error("Backend job failed: {0}")]
    Backend(FailureCause),

    /// The run was cancelled while this stage was in flight.
    #[error("Cancelled: {reason}")]
    Cancelled {
        /// The recorded cancellation reason.
        reason: String,
    },
}

impl StageFailure {
    /// The machine-readable cause for payloads.
    ///
    /// Backend failures pass the backend's cause through verbatim; every
    /// other variant maps to a stable code with the display text as the
    /// message.
    #[must_use]
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Backend(cause) => cause.clone(),
            Self::PreconditionFailed { .. } => {
                FailureCause::new("precondition_failed", self.to_string())
            }
            Self::Launch(_) => FailureCause::new("launch_error", self.to_string()),
            Self::Timeout { .. } => FailureCause::new("timeout", self.to_string()),
            Self::MissingOutput { .. } => FailureCause::new("missing_output", self.to_string()),
            Self::StoreUnavailable { .. } => {
                FailureCause::new("store_unavailable", self.to_string())
            }
            Self::Cancelled { .. } => FailureCause::new("cancelled", self.to_string()),
        }
    }

    /// Returns true if re-running the whole stage could succeed.
    ///
    /// Transient launch transport errors and store unavailability qualify;
    /// backend job failures, timeouts, missing inputs and outputs, and
    /// cancellations are terminal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Launch(err) => err.is_transient(),
            Self::StoreUnavailable { .. } => true,
            _ => false,
        }
    }
}

/// Errors that reject a pipeline submission before any job launches.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// The requested stage window is reversed.
    #[error("Invalid stage window: '{start}' comes after '{stop_after}'")]
    InvalidStageWindow {
        /// Requested first stage.
        start: Stage,
        /// Requested last stage.
        stop_after: Stage,
    },

    /// A run with the same job id is already in flight.
    #[error("A run with job id '{job_id}' is already in progress")]
    AlreadyRunning {
        /// The contested job id.
        job_id: String,
    },

    /// The supplied job id cannot form valid job names.
    #[error("{0}")]
    InvalidName(#[from] NameError),

    /// The request is malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// What is wrong with the request.
        reason: String,
    },
}

impl SubmitError {
    /// Creates an invalid-request error.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}
