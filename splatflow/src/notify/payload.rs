//! Terminal notification payloads.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::context::{JobId, RunStatus, StageOutputs};
use crate::errors::{FailureCause, StageFailure};
use crate::stages::Stage;
use crate::store::Location;

/// What the requester learns when a run reaches a terminal state.
///
/// Success-class payloads (full completion and requested early stop alike)
/// carry the produced outputs and no failure fields. Failure payloads add
/// the failing stage and a machine-readable cause.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// The run's job id.
    pub job_id: String,
    /// Notification recipient.
    pub requester_email: String,
    /// Terminal status of the run.
    pub status: RunStatus,
    /// Verified output locations, keyed by stage.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub stage_outputs: BTreeMap<Stage, Location>,
    /// The stage that ended the run, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_stage: Option<Stage>,
    /// Machine-readable failure cause, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureCause>,
}

impl NotificationPayload {
    /// Builds a success-class payload.
    ///
    /// Used for both `Succeeded` and `PartiallySucceeded`: an early stop
    /// reports exactly like a full completion, only with a different
    /// status.
    #[must_use]
    pub fn success(
        job_id: &JobId,
        requester_email: impl Into<String>,
        status: RunStatus,
        outputs: &StageOutputs,
    ) -> Self {
        debug_assert!(status.is_success_class());
        Self {
            job_id: job_id.as_str().to_string(),
            requester_email: requester_email.into(),
            status,
            stage_outputs: outputs.to_map(),
            failing_stage: None,
            cause: None,
        }
    }

    /// Builds a failure payload.
    #[must_use]
    pub fn failure(
        job_id: &JobId,
        requester_email: impl Into<String>,
        outputs: &StageOutputs,
        failing_stage: Stage,
        failure: &StageFailure,
    ) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
            requester_email: requester_email.into(),
            status: RunStatus::Failed,
            stage_outputs: outputs.to_map(),
            failing_stage: Some(failing_stage),
            cause: Some(failure.cause()),
        }
    }

    /// Returns true for success-class payloads.
    #[must_use]
    pub fn is_success_class(&self) -> bool {
        self.status.is_success_class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureCause;

    fn outputs_with_sfm() -> StageOutputs {
        let mut outputs = StageOutputs::new();
        outputs
            .record(Stage::Sfm, Location::new("runs/abc/sfm/output"))
            .unwrap();
        outputs
    }

    #[test]
    fn test_success_payload_has_no_failure_fields() {
        let job_id = JobId::parse("abc123").unwrap();
        let payload = NotificationPayload::success(
            &job_id,
            "artist@example.com",
            RunStatus::PartiallySucceeded,
            &outputs_with_sfm(),
        );

        assert!(payload.is_success_class());
        assert!(payload.failing_stage.is_none());
        assert!(payload.cause.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "partially_succeeded");
        assert!(json.get("failingStage").is_none());
        assert_eq!(json["stageOutputs"]["sfm"], "runs/abc/sfm/output");
    }

    #[test]
    fn test_failure_payload_shape() {
        let job_id = JobId::parse("abc123").unwrap();
        let failure = StageFailure::Backend(FailureCause::new("OOM", "CUDA out of memory"));
        let payload = NotificationPayload::failure(
            &job_id,
            "artist@example.com",
            &outputs_with_sfm(),
            Stage::Train,
            &failure,
        );

        assert!(!payload.is_success_class());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failingStage"], "train");
        assert_eq!(json["cause"]["code"], "OOM");
        // Prior outputs still reported, so partial work is discoverable.
        assert_eq!(json["stageOutputs"]["sfm"], "runs/abc/sfm/output");
    }
}
