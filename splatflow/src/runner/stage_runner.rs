//! Drives a single stage launch to a terminal result.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::context::PipelineContext;
use crate::errors::{FailureCause, StageFailure, StoreError};
use crate::launcher::{JobHandle, JobLauncher, JobState, LaunchRequest};
use crate::stages::{StageDescriptor, StageResult};
use crate::store::{ArtifactStore, Location, StageMetadata};

use super::policy::{PollPolicy, VerifyPolicy};

/// Runs one stage: precondition, launch, observe, verify.
///
/// A stage runner never errors; every way a stage can end is a
/// [`StageResult`]. There is no stage-level automatic retry: one call is
/// one launch, and whole-stage retries are a controller policy.
#[derive(Clone)]
pub struct StageRunner {
    launcher: Arc<dyn JobLauncher>,
    store: Arc<dyn ArtifactStore>,
    poll: PollPolicy,
    verify: VerifyPolicy,
}

impl StageRunner {
    /// Creates a runner with default polling and verification policies.
    #[must_use]
    pub fn new(launcher: Arc<dyn JobLauncher>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            launcher,
            store,
            poll: PollPolicy::default(),
            verify: VerifyPolicy::default(),
        }
    }

    /// Sets the poll policy.
    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the verification policy.
    #[must_use]
    pub fn with_verify_policy(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    /// Runs `descriptor`'s stage for the given run context.
    ///
    /// The stage's input must already exist; on success the declared
    /// output location is verified before the result is reported. The
    /// `cancel` token interrupts polling and triggers best-effort remote
    /// teardown.
    pub async fn run(
        &self,
        descriptor: &StageDescriptor,
        ctx: &PipelineContext,
        cancel: &CancelToken,
    ) -> StageResult {
        let started = Instant::now();
        let stage = descriptor.stage;

        if cancel.is_cancelled() {
            return StageResult::failed(stage, self.cancelled_failure(cancel), started.elapsed());
        }

        // Precondition: the input artifact must exist before anything
        // launches.
        let input = match ctx.stage_input(stage) {
            Some(input) => input,
            None => {
                let expected = stage
                    .prev()
                    .map_or_else(|| ctx.input_location().clone(), |p| ctx.layout().stage_output(p));
                return StageResult::failed(
                    stage,
                    StageFailure::PreconditionFailed {
                        stage,
                        location: expected,
                    },
                    started.elapsed(),
                );
            }
        };
        match self.exists_with_retry(&input).await {
            Ok(true) => {}
            Ok(false) => {
                return StageResult::failed(
                    stage,
                    StageFailure::PreconditionFailed {
                        stage,
                        location: input,
                    },
                    started.elapsed(),
                );
            }
            Err(failure) => return StageResult::failed(stage, failure, started.elapsed()),
        }

        let request = LaunchRequest {
            descriptor: descriptor.clone(),
            name_root: ctx.job_id().as_str().to_string(),
            input,
            output: ctx.layout().stage_output(stage),
            metadata_location: ctx.layout().stage_metadata(stage),
            hyperparameters: ctx.hyperparameters().for_stage(stage),
            environment: ctx.environment().clone(),
        };

        let handle = match self.launcher.launch(&request).await {
            Ok(handle) => handle,
            Err(err) => {
                return StageResult::failed(stage, StageFailure::Launch(err), started.elapsed());
            }
        };
        info!(
            job_id = %ctx.job_id(),
            stage = %stage,
            job_name = %handle.job_name,
            "Launched stage job"
        );

        // Observe the job to a terminal state within the stage budget.
        let mut attempt: u32 = 0;
        loop {
            if started.elapsed() >= descriptor.timeout {
                self.cancel_remote(&handle, "stage timed out").await;
                return StageResult::failed(
                    stage,
                    StageFailure::Timeout {
                        stage,
                        budget: descriptor.timeout,
                    },
                    started.elapsed(),
                );
            }
            if cancel.is_cancelled() {
                self.cancel_remote(&handle, "run cancelled").await;
                return StageResult::failed(
                    stage,
                    self.cancelled_failure(cancel),
                    started.elapsed(),
                );
            }

            match self.launcher.status(&handle).await {
                Ok(status) => match status.state {
                    JobState::Succeeded => break,
                    JobState::Failed => {
                        let cause = status.cause.unwrap_or_else(|| {
                            FailureCause::new("unknown", "backend reported failure without a cause")
                        });
                        return StageResult::failed(
                            stage,
                            StageFailure::Backend(cause),
                            started.elapsed(),
                        );
                    }
                    JobState::Queued | JobState::Running => {
                        debug!(job_name = %handle.job_name, state = %status.state, "Stage job not terminal yet");
                    }
                },
                // Absorbed: the next poll re-observes, and the stage
                // budget bounds how long a flaky backend can stall us.
                Err(err) => {
                    warn!(job_name = %handle.job_name, error = %err, "Status poll failed");
                }
            }

            let remaining = descriptor.timeout.saturating_sub(started.elapsed());
            let delay = self.poll.delay(attempt).min(remaining);
            attempt += 1;
            tokio::select! {
                () = cancel.cancelled() => {
                    self.cancel_remote(&handle, "run cancelled").await;
                    return StageResult::failed(
                        stage,
                        self.cancelled_failure(cancel),
                        started.elapsed(),
                    );
                }
                () = tokio::time::sleep(delay) => {}
            }
        }

        // The backend claims success; trust the store, not the claim.
        match self.exists_with_retry(&request.output).await {
            Ok(true) => {}
            Ok(false) => {
                return StageResult::failed(
                    stage,
                    StageFailure::MissingOutput {
                        location: request.output,
                    },
                    started.elapsed(),
                );
            }
            Err(failure) => return StageResult::failed(stage, failure, started.elapsed()),
        }

        let metadata = self.read_metadata(&request.metadata_location).await;
        info!(
            job_id = %ctx.job_id(),
            stage = %stage,
            output = %request.output,
            "Stage completed"
        );

        let mut result = StageResult::succeeded(stage, request.output, started.elapsed());
        if let Some(metadata) = metadata {
            result = result.with_metadata(metadata);
        }
        result
    }

    /// Existence check with bounded retries on transient store faults.
    async fn exists_with_retry(&self, location: &Location) -> Result<bool, StageFailure> {
        let mut failures: usize = 0;
        loop {
            match self.store.exists(location).await {
                Ok(found) => return Ok(found),
                Err(StoreError::NotFound { .. }) => return Ok(false),
                Err(StoreError::Unavailable { reason }) => {
                    failures += 1;
                    if failures >= self.verify.max_attempts {
                        return Err(StageFailure::StoreUnavailable { reason });
                    }
                    let delay = self.verify.delay(failures as u32 - 1);
                    debug!(
                        location = %location,
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "Store unavailable, retrying existence check"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Reads the stage metadata document, tolerating absence and damage.
    async fn read_metadata(&self, location: &Location) -> Option<StageMetadata> {
        match self.store.read(location).await {
            Ok(bytes) => match StageMetadata::from_bytes(&bytes) {
                Ok(document) => Some(document),
                Err(err) => {
                    warn!(location = %location, error = %err, "Malformed stage metadata document");
                    None
                }
            },
            Err(err) => {
                debug!(location = %location, error = %err, "No stage metadata document");
                None
            }
        }
    }

    async fn cancel_remote(&self, handle: &JobHandle, reason: &str) {
        handle.cancel.cancel(reason);
        if let Err(err) = self.launcher.cancel(handle).await {
            warn!(job_name = %handle.job_name, error = %err, "Best-effort job cancellation failed");
        }
    }

    fn cancelled_failure(&self, cancel: &CancelToken) -> StageFailure {
        StageFailure::Cancelled {
            reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
        }
    }
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("poll", &self.poll)
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineRequest;
    use crate::errors::LaunchError;
    use crate::stages::Stage;
    use crate::store::InMemoryArtifactStore;
    use crate::testing::{FakeBackend, JobScript};
    use std::time::Duration;

    fn fast_poll() -> PollPolicy {
        PollPolicy::new()
            .with_initial(Duration::from_millis(1))
            .with_max(Duration::from_millis(5))
            .without_jitter()
    }

    fn fast_verify() -> VerifyPolicy {
        VerifyPolicy::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(1))
    }

    fn context() -> PipelineContext {
        PipelineContext::from_request(
            PipelineRequest::new("artist@example.com", "scans/abc123/images")
                .with_job_id("abc123")
                .with_env("TORCH_CUDA_ARCH_LIST", "8.6")
                .with_hyperparameter(Stage::Sfm, "matcher", serde_json::json!("exhaustive")),
        )
        .unwrap()
    }

    fn runner(
        backend: &Arc<FakeBackend>,
        store: &Arc<InMemoryArtifactStore>,
    ) -> StageRunner {
        StageRunner::new(backend.clone(), store.clone())
            .with_poll_policy(fast_poll())
            .with_verify_policy(fast_verify())
    }

    fn seed_input(store: &InMemoryArtifactStore, ctx: &PipelineContext) {
        store.insert(ctx.input_location(), b"images".as_slice());
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_launching() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let ctx = context();

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(matches!(
            result.failure,
            Some(StageFailure::PreconditionFailed { stage: Stage::Sfm, .. })
        ));
        assert_eq!(backend.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_success_verifies_output_and_attaches_metadata() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(result.is_success(), "{:?}", result.failure);
        assert_eq!(result.output, Some(ctx.layout().stage_output(Stage::Sfm)));
        let metadata = result.metadata.expect("fake backend writes metadata");
        assert_eq!(metadata.stage, Stage::Sfm);
    }

    #[tokio::test]
    async fn test_launch_carries_env_params_and_layout() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let ctx = context();
        seed_input(&store, &ctx);

        runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        let launches = backend.launches();
        assert_eq!(launches.len(), 1);
        let request = &launches[0];
        assert_eq!(request.job_name().unwrap().as_str(), "abc123-sfm");
        assert_eq!(request.environment, *ctx.environment());
        assert_eq!(
            request.hyperparameters.get("matcher"),
            Some(&serde_json::json!("exhaustive"))
        );
        assert_eq!(request.input, *ctx.input_location());
        assert_eq!(request.output, ctx.layout().stage_output(Stage::Sfm));
        assert_eq!(
            request.metadata_location,
            ctx.layout().stage_metadata(Stage::Sfm)
        );
    }

    #[tokio::test]
    async fn test_rejected_launch_is_a_launch_failure() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        backend.reject(Stage::Sfm, "gpu quota exceeded");
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(matches!(
            result.failure,
            Some(StageFailure::Launch(LaunchError::Rejected { .. }))
        ));
    }

    #[tokio::test]
    async fn test_backend_cause_is_captured_verbatim() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        backend.fail_with(Stage::Sfm, FailureCause::new("OOM", "CUDA out of memory"));
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        match result.failure {
            Some(StageFailure::Backend(cause)) => {
                assert_eq!(cause.code, "OOM");
                assert_eq!(cause.message, "CUDA out of memory");
            }
            other => panic!("expected backend failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_tears_the_job_down() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        backend.hang(Stage::Sfm);
        let ctx = context();
        seed_input(&store, &ctx);

        let descriptor =
            StageDescriptor::default_for(Stage::Sfm).with_timeout(Duration::from_millis(30));
        let result = runner(&backend, &store)
            .run(&descriptor, &ctx, &CancelToken::new())
            .await;

        assert!(matches!(
            result.failure,
            Some(StageFailure::Timeout { stage: Stage::Sfm, .. })
        ));
        assert!(backend.was_cancelled("abc123-sfm"));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_polling() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        backend.hang(Stage::Sfm);
        let ctx = context();
        seed_input(&store, &ctx);

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel("artist changed their mind");
        });

        let slow_poll = PollPolicy::new()
            .with_initial(Duration::from_secs(30))
            .without_jitter();
        let result = StageRunner::new(backend.clone(), store.clone())
            .with_poll_policy(slow_poll)
            .with_verify_policy(fast_verify())
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &cancel)
            .await;

        match result.failure {
            Some(StageFailure::Cancelled { reason }) => {
                assert_eq!(reason, "artist changed their mind");
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert!(backend.was_cancelled("abc123-sfm"));
    }

    #[tokio::test]
    async fn test_transient_store_faults_are_retried() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let ctx = context();
        seed_input(&store, &ctx);
        // Two faults, three attempts: the precondition check recovers.
        store.fail_next_reads(2);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(result.is_success(), "{:?}", result.failure);
    }

    #[tokio::test]
    async fn test_exhausted_store_retries_fail_the_stage() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let ctx = context();
        seed_input(&store, &ctx);
        store.fail_next_reads(5);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(matches!(
            result.failure,
            Some(StageFailure::StoreUnavailable { .. })
        ));
        assert_eq!(backend.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_verification_retries_after_job_completion() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        // The store flakes right after the job finishes; verification
        // retries absorb it.
        backend.fault_reads_after_success(Stage::Sfm, 2);
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(result.is_success(), "{:?}", result.failure);
    }

    #[tokio::test]
    async fn test_success_claim_without_output_is_missing_output() {
        let store = Arc::new(InMemoryArtifactStore::new());
        // No store attached: the fake job claims success but writes nothing.
        let backend = Arc::new(FakeBackend::new());
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(matches!(
            result.failure,
            Some(StageFailure::MissingOutput { .. })
        ));
        assert_eq!(backend.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_polls_until_the_job_finishes() {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        backend.succeed_after(Stage::Sfm, 3);
        let ctx = context();
        seed_input(&store, &ctx);

        let result = runner(&backend, &store)
            .run(&StageDescriptor::default_for(Stage::Sfm), &ctx, &CancelToken::new())
            .await;

        assert!(result.is_success(), "{:?}", result.failure);
        assert!(backend.status_count("abc123-sfm") >= 4);
    }
}
