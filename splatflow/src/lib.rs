//! # Splatflow
//!
//! An orchestrator for the photogrammetry-to-3D-asset pipeline: structure
//! from motion, Gaussian splat training, and splat compression, each running
//! as a remote compute job.
//!
//! Splatflow provides:
//!
//! - **Sequential stage orchestration**: one run walks its stage window in
//!   order, handing each stage's output to the next
//! - **A naming contract**: derived, validated, collision-checked job names
//! - **Artifact verification**: a stage succeeds only when its declared
//!   output exists in the store
//! - **Best-effort cancellation**: runs observe cancellation between polls
//!   and tear their remote jobs down
//! - **Terminal notification**: every accepted run notifies its requester
//!   exactly once
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use splatflow::prelude::*;
//!
//! let controller = PipelineController::new(launcher, store)
//!     .with_notification_sink(sink);
//!
//! let request = PipelineRequest::new("artist@example.com", "scans/abc123/images")
//!     .with_job_id("abc123")
//!     .with_stop_after(Stage::Train);
//!
//! let report = controller.submit(request).await?;
//! assert!(report.is_success_class());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancel;
pub mod context;
pub mod controller;
pub mod errors;
pub mod launcher;
pub mod naming;
pub mod notify;
pub mod runner;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::context::{
        EnvMap, HyperparameterMap, JobId, PipelineContext, PipelineRequest, RunStatus,
        StageOutputs,
    };
    pub use crate::controller::{PipelineController, RunReport};
    pub use crate::errors::{
        FailureCause, LaunchError, NameError, NotifyError, StageFailure, StoreError, SubmitError,
    };
    pub use crate::launcher::{JobHandle, JobLauncher, JobState, JobStatus, LaunchRequest};
    pub use crate::naming::JobName;
    pub use crate::notify::{
        CollectingNotificationSink, NoOpNotificationSink, NotificationPayload, NotificationSink,
        TracingNotificationSink,
    };
    pub use crate::runner::{PollPolicy, StageRunner, VerifyPolicy};
    pub use crate::stages::{
        ArtifactKind, Stage, StageDescriptor, StagePlan, StageResult, StageStatus, StageWindow,
    };
    pub use crate::store::{
        ArtifactStore, FsArtifactStore, InMemoryArtifactStore, Location, RunLayout, StageMetadata,
    };
}
