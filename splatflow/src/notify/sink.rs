//! Notification sink trait and implementations.

use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::NotifyError;

use super::payload::NotificationPayload;

/// Delivers terminal-state notifications to the requester.
///
/// The controller invokes the sink exactly once per accepted run, after
/// the terminal status is decided. Delivery failure never changes the
/// run's outcome.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one payload.
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError>;
}

/// A sink that discards all notifications.
///
/// For deployments that consume run reports directly and want no
/// out-of-band delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn notify(&self, _payload: &NotificationPayload) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A sink that logs payloads through the tracing framework.
///
/// Success-class payloads log at info, failures at error, both with the
/// same structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        if payload.is_success_class() {
            info!(
                job_id = %payload.job_id,
                status = %payload.status,
                outputs = payload.stage_outputs.len(),
                "Run finished"
            );
        } else {
            error!(
                job_id = %payload.job_id,
                status = %payload.status,
                failing_stage = payload.failing_stage.map(|s| s.name()),
                cause = payload.cause.as_ref().map(|c| c.code.as_str()),
                "Run failed"
            );
        }
        Ok(())
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingNotificationSink {
    payloads: parking_lot::RwLock<Vec<NotificationPayload>>,
}

impl CollectingNotificationSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected payloads.
    #[must_use]
    pub fn payloads(&self) -> Vec<NotificationPayload> {
        self.payloads.read().clone()
    }

    /// Returns payloads for one job id.
    #[must_use]
    pub fn for_job(&self, job_id: &str) -> Vec<NotificationPayload> {
        self.payloads
            .read()
            .iter()
            .filter(|p| p.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Number of collected payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }

    /// Clears collected payloads.
    pub fn clear(&self) {
        self.payloads.write().clear();
    }
}

#[async_trait]
impl NotificationSink for CollectingNotificationSink {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        self.payloads.write().push(payload.clone());
        Ok(())
    }
}
