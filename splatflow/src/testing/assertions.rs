//! Test assertions for run reports and notification payloads.

use crate::context::RunStatus;
use crate::controller::RunReport;
use crate::notify::NotificationPayload;
use crate::stages::Stage;

/// Asserts that the run completed the full pipeline.
pub fn assert_run_succeeded(report: &RunReport) {
    assert_eq!(
        report.status,
        RunStatus::Succeeded,
        "Expected a succeeded run, got {:?} (failure: {:?})",
        report.status,
        report.failure()
    );
}

/// Asserts that the run stopped early with every executed stage succeeding.
pub fn assert_run_partially_succeeded(report: &RunReport) {
    assert_eq!(
        report.status,
        RunStatus::PartiallySucceeded,
        "Expected a partially succeeded run, got {:?} (failure: {:?})",
        report.status,
        report.failure()
    );
}

/// Asserts that the run failed and that `stage` is what stopped it.
pub fn assert_run_failed_at(report: &RunReport, stage: Stage) {
    assert_eq!(
        report.status,
        RunStatus::Failed,
        "Expected a failed run, got {:?}",
        report.status
    );
    assert_eq!(
        report.failing_stage(),
        Some(stage),
        "Expected the run to fail at '{stage}', got {:?}",
        report.failing_stage()
    );
}

/// Asserts that a verified output location was recorded for `stage`.
pub fn assert_output_recorded(report: &RunReport, stage: Stage) {
    assert!(
        report.stage_outputs.contains_key(&stage),
        "Expected an output for '{stage}'. Recorded stages: {:?}",
        report.stage_outputs.keys().collect::<Vec<_>>()
    );
}

/// Asserts that `stage` has no result, meaning it was never attempted.
pub fn assert_stage_never_ran(report: &RunReport, stage: Stage) {
    assert!(
        report.result_for(stage).is_none(),
        "Expected '{stage}' to never run, but it has a result: {:?}",
        report.result_for(stage)
    );
}

/// Asserts a success-class payload: no failing stage, no cause.
pub fn assert_payload_success(payload: &NotificationPayload) {
    assert!(
        payload.status.is_success_class(),
        "Expected a success-class payload, got status {:?}",
        payload.status
    );
    assert!(
        payload.failing_stage.is_none() && payload.cause.is_none(),
        "Success-class payload must not carry failure fields: {payload:?}"
    );
}

/// Asserts a failure payload naming `stage` with cause code `code`.
pub fn assert_payload_failure(payload: &NotificationPayload, stage: Stage, code: &str) {
    assert_eq!(
        payload.status,
        RunStatus::Failed,
        "Expected a failed payload, got status {:?}",
        payload.status
    );
    assert_eq!(
        payload.failing_stage,
        Some(stage),
        "Expected failing stage '{stage}', got {:?}",
        payload.failing_stage
    );
    let actual = payload.cause.as_ref().map(|cause| cause.code.as_str());
    assert_eq!(
        actual,
        Some(code),
        "Expected cause code '{code}', got {actual:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{JobId, StageOutputs};
    use crate::errors::{FailureCause, StageFailure};
    use crate::stages::StageResult;
    use crate::store::Location;
    use std::time::Duration;

    fn failed_report() -> RunReport {
        let sfm = StageResult::succeeded(
            Stage::Sfm,
            Location::new("runs/abc123/sfm/output"),
            Duration::from_secs(1),
        );
        let train = StageResult::failed(
            Stage::Train,
            StageFailure::Backend(FailureCause::new("OOM", "CUDA out of memory")),
            Duration::from_secs(2),
        );
        RunReport {
            job_id: "abc123".to_string(),
            status: RunStatus::Failed,
            stage_outputs: [(Stage::Sfm, Location::new("runs/abc123/sfm/output"))]
                .into_iter()
                .collect(),
            stage_results: vec![sfm, train],
            duration: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_failure_assertions_accept_a_failed_run() {
        let report = failed_report();
        assert_run_failed_at(&report, Stage::Train);
        assert_output_recorded(&report, Stage::Sfm);
        assert_stage_never_ran(&report, Stage::Compress);
    }

    #[test]
    #[should_panic(expected = "Expected a succeeded run")]
    fn test_succeeded_assertion_rejects_a_failed_run() {
        assert_run_succeeded(&failed_report());
    }

    #[test]
    #[should_panic(expected = "Expected the run to fail at 'compress'")]
    fn test_failed_at_checks_the_stage() {
        assert_run_failed_at(&failed_report(), Stage::Compress);
    }

    #[test]
    fn test_payload_assertions() {
        let job_id = JobId::parse("abc123").unwrap();
        let mut outputs = StageOutputs::new();
        outputs
            .record(Stage::Sfm, Location::new("runs/abc123/sfm/output"))
            .unwrap();

        let success = NotificationPayload::success(
            &job_id,
            "artist@example.com",
            RunStatus::PartiallySucceeded,
            &outputs,
        );
        assert_payload_success(&success);

        let failure = NotificationPayload::failure(
            &job_id,
            "artist@example.com",
            &outputs,
            Stage::Train,
            &StageFailure::Backend(FailureCause::new("OOM", "CUDA out of memory")),
        );
        assert_payload_failure(&failure, Stage::Train, "OOM");
    }

    #[test]
    #[should_panic(expected = "Success-class payload must not carry failure fields")]
    fn test_payload_success_rejects_failure_fields() {
        let job_id = JobId::parse("abc123").unwrap();
        let mut payload = NotificationPayload::success(
            &job_id,
            "artist@example.com",
            RunStatus::Succeeded,
            &StageOutputs::new(),
        );
        payload.failing_stage = Some(Stage::Train);
        assert_payload_success(&payload);
    }
}
