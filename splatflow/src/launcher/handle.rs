//! Remote job handles and observed status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cancel::CancelToken;
use crate::errors::FailureCause;
use crate::naming::JobName;

/// Backend-reported lifecycle of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted but not yet scheduled.
    Queued,
    /// Executing.
    Running,
    /// Finished and claims success.
    Succeeded,
    /// Finished and reports failure.
    Failed,
}

impl JobState {
    /// Returns true for terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A point-in-time observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    /// Where the job is in its lifecycle.
    pub state: JobState,
    /// The backend's failure cause, present when `state` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureCause>,
}

impl JobStatus {
    /// A queued observation.
    #[must_use]
    pub fn queued() -> Self {
        Self {
            state: JobState::Queued,
            cause: None,
        }
    }

    /// A running observation.
    #[must_use]
    pub fn running() -> Self {
        Self {
            state: JobState::Running,
            cause: None,
        }
    }

    /// A succeeded observation.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            state: JobState::Succeeded,
            cause: None,
        }
    }

    /// A failed observation carrying the backend's cause.
    #[must_use]
    pub fn failed(cause: FailureCause) -> Self {
        Self {
            state: JobState::Failed,
            cause: Some(cause),
        }
    }
}

/// An opaque reference to a launched remote job.
///
/// Everything the orchestrator later does with a job (polling, best-effort
/// cancellation) goes through its handle. Clones share the teardown token,
/// so a cancel requested through any copy is visible on all of them.
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    /// Backend-assigned identifier for this execution.
    pub run_id: String,
    /// The unique name the job was launched under.
    pub job_name: JobName,
    /// When the backend accepted the launch.
    pub started_at: DateTime<Utc>,
    /// Records that teardown was requested for this job.
    #[serde(skip)]
    pub cancel: CancelToken,
}

impl JobHandle {
    /// Creates a handle stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, job_name: JobName) -> Self {
        Self {
            run_id: run_id.into(),
            job_name,
            started_at: Utc::now(),
            cancel: CancelToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::Stage;

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_failed_status_carries_cause() {
        let status = JobStatus::failed(FailureCause::new("OOM", "CUDA out of memory"));
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.cause.as_ref().map(|c| c.code.as_str()), Some("OOM"));
    }

    #[test]
    fn test_handle_keeps_the_launch_name() {
        let name = JobName::derive("abc123", Stage::Sfm).unwrap();
        let handle = JobHandle::new("backend-run-1", name);
        assert_eq!(handle.job_name.as_str(), "abc123-sfm");
        assert_eq!(handle.run_id, "backend-run-1");
        assert!(!handle.cancel.is_cancelled());
    }

    #[test]
    fn test_teardown_request_reaches_every_clone() {
        let name = JobName::derive("abc123", Stage::Train).unwrap();
        let handle = JobHandle::new("backend-run-7", name);
        let clone = handle.clone();

        clone.cancel.cancel("stage timed out");

        assert!(handle.cancel.is_cancelled());
        assert_eq!(handle.cancel.reason(), Some("stage timed out".to_string()));
    }
}
