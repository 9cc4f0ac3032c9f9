//! Test fixtures for orchestrator testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::context::PipelineRequest;
use crate::controller::PipelineController;
use crate::errors::NotifyError;
use crate::notify::{CollectingNotificationSink, NotificationPayload, NotificationSink};
use crate::runner::{PollPolicy, VerifyPolicy};
use crate::store::{InMemoryArtifactStore, Location};
use crate::testing::FakeBackend;

/// A poll policy tightened to milliseconds for tests.
#[must_use]
pub fn fast_poll() -> PollPolicy {
    PollPolicy::new()
        .with_initial(Duration::from_millis(1))
        .with_max(Duration::from_millis(5))
        .without_jitter()
}

/// A verification policy tightened to milliseconds for tests.
#[must_use]
pub fn fast_verify() -> VerifyPolicy {
    VerifyPolicy::new()
        .with_max_attempts(3)
        .with_base_delay(Duration::from_millis(1))
}

/// A full-pipeline request in the shape external callers submit.
#[must_use]
pub fn sample_request(job_id: impl Into<String>) -> PipelineRequest {
    let job_id = job_id.into();
    PipelineRequest::new("artist@example.com", format!("scans/{job_id}/images"))
        .with_job_id(job_id)
}

/// Installs a test subscriber honoring `RUST_LOG`.
///
/// Repeated calls are no-ops, so every test can call it first.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A sink that refuses every delivery and counts the attempts.
#[derive(Debug, Default)]
pub struct FailingNotificationSink {
    attempts: Mutex<usize>,
}

impl FailingNotificationSink {
    /// Creates a new failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of deliveries attempted.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl NotificationSink for FailingNotificationSink {
    async fn notify(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
        *self.attempts.lock() += 1;
        Err(NotifyError::new("smtp relay refused connection"))
    }
}

/// An orchestrator wired against fakes, ready to submit runs.
pub struct TestHarness {
    /// The shared artifact store.
    pub store: Arc<InMemoryArtifactStore>,
    /// The scriptable backend.
    pub backend: Arc<FakeBackend>,
    /// Collects terminal notifications.
    pub sink: Arc<CollectingNotificationSink>,
    /// The controller under test.
    pub controller: PipelineController,
}

impl TestHarness {
    /// Creates a harness with fast policies and a store-backed backend.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryArtifactStore::new());
        let backend = Arc::new(FakeBackend::with_store(store.clone()));
        let sink = Arc::new(CollectingNotificationSink::new());
        let controller = PipelineController::new(backend.clone(), store.clone())
            .with_notification_sink(sink.clone())
            .with_poll_policy(fast_poll())
            .with_verify_policy(fast_verify());
        Self {
            store,
            backend,
            sink,
            controller,
        }
    }

    /// Seeds an input artifact.
    pub fn seed_input(&self, location: &Location) {
        self.store.insert(location, b"input images".as_slice());
    }

    /// Builds a [`sample_request`] whose input artifact already exists.
    #[must_use]
    pub fn seeded_request(&self, job_id: &str) -> PipelineRequest {
        let request = sample_request(job_id);
        self.seed_input(&request.input_location);
        request
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
