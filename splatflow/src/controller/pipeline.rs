//! Sequential run orchestration.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::context::{PipelineContext, PipelineRequest, RunStatus};
use crate::errors::SubmitError;
use crate::launcher::JobLauncher;
use crate::notify::{NotificationPayload, NotificationSink, TracingNotificationSink};
use crate::runner::{PollPolicy, StageRunner, VerifyPolicy};
use crate::stages::{StageDescriptor, StagePlan, StageResult};
use crate::store::ArtifactStore;

use super::active::ActiveRuns;
use super::report::RunReport;

/// Orchestrates pipeline runs from submission to terminal notification.
///
/// Stages within a run execute strictly in order; independent runs only
/// share the controller and proceed concurrently. Every accepted run ends
/// in exactly one terminal status and one notification, whatever its
/// stages do.
pub struct PipelineController {
    runner: StageRunner,
    plan: StagePlan,
    sink: Arc<dyn NotificationSink>,
    active: ActiveRuns,
    max_stage_attempts: usize,
}

impl PipelineController {
    /// Creates a controller with the default plan, policies, and a
    /// tracing notification sink.
    #[must_use]
    pub fn new(launcher: Arc<dyn JobLauncher>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            runner: StageRunner::new(launcher, store),
            plan: StagePlan::default(),
            sink: Arc::new(TracingNotificationSink::new()),
            active: ActiveRuns::new(),
            max_stage_attempts: 1,
        }
    }

    /// Sets the notification sink.
    #[must_use]
    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the stage plan.
    #[must_use]
    pub fn with_plan(mut self, plan: StagePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Sets the job status poll policy.
    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.runner = self.runner.with_poll_policy(poll);
        self
    }

    /// Sets the artifact verification policy.
    #[must_use]
    pub fn with_verify_policy(mut self, verify: VerifyPolicy) -> Self {
        self.runner = self.runner.with_verify_policy(verify);
        self
    }

    /// Allows up to `attempts` whole-stage attempts on transient failures.
    ///
    /// The default of 1 disables stage retries. Only failures classified
    /// transient re-run; a backend job that fails stays failed.
    #[must_use]
    pub fn with_max_stage_attempts(mut self, attempts: usize) -> Self {
        self.max_stage_attempts = attempts.max(1);
        self
    }

    /// Runs a pipeline submission to its terminal state.
    ///
    /// Stages execute sequentially through the requested window. The first
    /// stage failure halts the run; a window that stops before the final
    /// stage ends as `PartiallySucceeded`. The requester is notified
    /// exactly once either way.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] when the request is invalid or a run with
    /// the same job id is already in flight. Rejected submissions launch
    /// nothing and notify nobody.
    pub async fn submit(&self, request: PipelineRequest) -> Result<RunReport, SubmitError> {
        let started = Instant::now();
        let mut ctx = PipelineContext::from_request(request)?;
        let guard = self.active.begin(ctx.job_id().as_str())?;

        info!(
            job_id = %ctx.job_id(),
            start = %ctx.window().start(),
            stop_after = %ctx.window().stop_after(),
            "Run accepted"
        );

        let mut results: Vec<StageResult> = Vec::with_capacity(ctx.window().len());
        for stage in ctx.window().iter() {
            ctx.set_status(RunStatus::Running(stage));
            let result = self
                .run_stage(self.plan.get(stage), &ctx, guard.token())
                .await;

            if let (true, Some(output)) = (result.is_success(), result.output.clone()) {
                if let Err(err) = ctx.record_output(stage, output) {
                    warn!(job_id = %ctx.job_id(), error = %err, "Dropping duplicate stage output");
                }
            }
            let failed = !result.is_success();
            results.push(result);
            if failed {
                break;
            }
        }

        let status = match results.iter().find(|result| !result.is_success()) {
            Some(_) => RunStatus::Failed,
            None if ctx.window().ends_at_pipeline_end() => RunStatus::Succeeded,
            None => RunStatus::PartiallySucceeded,
        };
        ctx.set_status(status);
        info!(job_id = %ctx.job_id(), status = %status, "Run finished");

        self.notify(&ctx, &results, status).await;

        Ok(RunReport {
            job_id: ctx.job_id().as_str().to_string(),
            status,
            stage_outputs: ctx.outputs().to_map(),
            stage_results: results,
            duration: started.elapsed(),
        })
    }

    /// Requests cancellation of an in-flight run.
    ///
    /// Best-effort: the run observes the request at its next poll or stage
    /// boundary and tears its remote job down. Returns false if no run
    /// with that id is in flight.
    pub fn cancel(&self, job_id: &str, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let requested = self.active.cancel(job_id, reason.as_str());
        if requested {
            info!(job_id, reason = %reason, "Cancellation requested");
        }
        requested
    }

    /// Returns true if a run with this job id is in flight.
    #[must_use]
    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.contains(job_id)
    }

    /// The number of runs in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Runs one stage, re-running it on transient failures up to the
    /// configured attempt budget.
    async fn run_stage(
        &self,
        descriptor: &StageDescriptor,
        ctx: &PipelineContext,
        cancel: &CancelToken,
    ) -> StageResult {
        let mut attempt = 1;
        loop {
            let result = self.runner.run(descriptor, ctx, cancel).await;
            match &result.failure {
                Some(failure)
                    if failure.is_transient()
                        && attempt < self.max_stage_attempts
                        && !cancel.is_cancelled() =>
                {
                    warn!(
                        job_id = %ctx.job_id(),
                        stage = %descriptor.stage,
                        attempt,
                        error = %failure,
                        "Transient stage failure, retrying stage"
                    );
                    attempt += 1;
                }
                _ => return result,
            }
        }
    }

    /// Delivers the single terminal notification for a run.
    ///
    /// Delivery failures are logged and absorbed; they never change the
    /// run's status.
    async fn notify(&self, ctx: &PipelineContext, results: &[StageResult], status: RunStatus) {
        let failure = results
            .iter()
            .find_map(|result| result.failure.as_ref().map(|f| (result.stage, f)));
        let payload = match failure {
            Some((stage, failure)) => NotificationPayload::failure(
                ctx.job_id(),
                ctx.requester_email(),
                ctx.outputs(),
                stage,
                failure,
            ),
            None => NotificationPayload::success(
                ctx.job_id(),
                ctx.requester_email(),
                status,
                ctx.outputs(),
            ),
        };
        if let Err(err) = self.sink.notify(&payload).await {
            warn!(job_id = %ctx.job_id(), error = %err, "Terminal notification failed");
        }
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("runner", &self.runner)
            .field("plan", &self.plan)
            .field("active", &self.active.len())
            .field("max_stage_attempts", &self.max_stage_attempts)
            .finish_non_exhaustive()
    }
}
