//! The compute-backend seam.
//!
//! A [`JobLauncher`] starts remote jobs, reports their status, and tears
//! them down on request. The orchestrator never talks to a backend except
//! through this trait.

use async_trait::async_trait;

use crate::errors::LaunchError;

mod handle;
mod request;

pub use handle::{JobHandle, JobState, JobStatus};
pub use request::LaunchRequest;

/// The seam to whatever actually runs compute jobs.
///
/// Implementations must be safe to share across concurrent runs.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Starts exactly one remote job for the request.
    ///
    /// Launches are idempotent under retry: a request whose derived name
    /// and [`LaunchRequest::fingerprint`] match an existing job returns
    /// that job's handle instead of starting a second one. A known name
    /// with a different fingerprint is
    /// [`LaunchError::AlreadyExists`]. Every entry of
    /// `request.environment` must reach the job verbatim.
    async fn launch(&self, request: &LaunchRequest) -> Result<JobHandle, LaunchError>;

    /// Observes the job's current status.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, LaunchError>;

    /// Requests best-effort teardown of the remote job.
    ///
    /// Returning `Ok(())` acknowledges the request, not the teardown;
    /// callers do not wait for the job to disappear.
    async fn cancel(&self, handle: &JobHandle) -> Result<(), LaunchError>;
}
