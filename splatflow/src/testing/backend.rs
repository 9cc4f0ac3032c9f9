//! A scriptable in-process compute backend.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::{FailureCause, LaunchError};
use crate::launcher::{JobHandle, JobLauncher, JobStatus, LaunchRequest};
use crate::stages::Stage;
use crate::store::{InMemoryArtifactStore, StageMetadata};

/// How a fake job behaves once launched.
#[derive(Debug, Clone)]
pub enum JobScript {
    /// Report running for `polls` observations, then succeed. With a store
    /// attached, the declared output and metadata get written on the
    /// transition.
    Succeed {
        /// Observations before the terminal state.
        polls: usize,
    },
    /// Report running for `polls` observations, then fail with `cause`.
    Fail {
        /// Observations before the terminal state.
        polls: usize,
        /// The cause the backend reports.
        cause: FailureCause,
    },
    /// Never reach a terminal state.
    Hang,
    /// Refuse the launch outright.
    Reject {
        /// The stated rejection reason.
        reason: String,
    },
}

#[derive(Debug)]
struct FakeJob {
    fingerprint: String,
    handle: JobHandle,
    script: JobScript,
    request: LaunchRequest,
    polls_seen: usize,
    finished: bool,
}

/// A fake [`JobLauncher`] that records launches and follows per-stage
/// scripts.
///
/// Jobs default to immediate success. The backend enforces the naming
/// contract the way a real cluster does: a known name with a matching
/// fingerprint returns the existing handle, a known name with different
/// content is refused.
#[derive(Debug, Default)]
pub struct FakeBackend {
    store: Option<Arc<InMemoryArtifactStore>>,
    scripts: Mutex<HashMap<Stage, JobScript>>,
    launch_faults: Mutex<HashMap<Stage, usize>>,
    success_faults: Mutex<HashMap<Stage, usize>>,
    jobs: DashMap<String, FakeJob>,
    launches: Mutex<Vec<LaunchRequest>>,
    status_counts: DashMap<String, usize>,
    cancelled: Mutex<Vec<String>>,
    next_run: AtomicU64,
}

impl FakeBackend {
    /// Creates a backend whose jobs succeed without writing anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose succeeding jobs write their declared output
    /// and metadata into `store`.
    #[must_use]
    pub fn with_store(store: Arc<InMemoryArtifactStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Sets the script for a stage's jobs.
    pub fn script(&self, stage: Stage, script: JobScript) {
        self.scripts.lock().insert(stage, script);
    }

    /// Scripts a stage to succeed after `polls` running observations.
    pub fn succeed_after(&self, stage: Stage, polls: usize) {
        self.script(stage, JobScript::Succeed { polls });
    }

    /// Scripts a stage to fail with `cause` on its first observation.
    pub fn fail_with(&self, stage: Stage, cause: FailureCause) {
        self.script(stage, JobScript::Fail { polls: 0, cause });
    }

    /// Scripts a stage to never finish.
    pub fn hang(&self, stage: Stage) {
        self.script(stage, JobScript::Hang);
    }

    /// Scripts a stage to refuse launches.
    pub fn reject(&self, stage: Stage, reason: impl Into<String>) {
        self.script(
            stage,
            JobScript::Reject {
                reason: reason.into(),
            },
        );
    }

    /// Makes the next `failures` launch attempts for a stage fail with a
    /// transient transport error.
    pub fn flaky_launch(&self, stage: Stage, failures: usize) {
        self.launch_faults.lock().insert(stage, failures);
    }

    /// Injects `faults` transient store read faults right after a stage's
    /// job succeeds, before anything verifies its output.
    pub fn fault_reads_after_success(&self, stage: Stage, faults: usize) {
        self.success_faults.lock().insert(stage, faults);
    }

    /// Every launch attempt, in order, including refused ones.
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.launches.lock().clone()
    }

    /// The number of launch attempts.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.launches.lock().len()
    }

    /// The number of launch attempts for one stage.
    #[must_use]
    pub fn launch_count_for(&self, stage: Stage) -> usize {
        self.launches
            .lock()
            .iter()
            .filter(|request| request.stage() == stage)
            .count()
    }

    /// The number of distinct jobs created.
    #[must_use]
    pub fn jobs_created(&self) -> usize {
        self.jobs.len()
    }

    /// The names of every created job, sorted.
    #[must_use]
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns true if a cancel call was observed for `job_name`.
    #[must_use]
    pub fn was_cancelled(&self, job_name: &str) -> bool {
        self.cancelled.lock().iter().any(|name| name == job_name)
    }

    /// The number of status polls observed for `job_name`.
    #[must_use]
    pub fn status_count(&self, job_name: &str) -> usize {
        self.status_counts
            .get(job_name)
            .map_or(0, |entry| *entry.value())
    }

    /// Clears created jobs and recorded calls; scripts stay in place.
    pub fn reset(&self) {
        self.jobs.clear();
        self.launches.lock().clear();
        self.status_counts.clear();
        self.cancelled.lock().clear();
    }

    fn script_for(&self, stage: Stage) -> JobScript {
        self.scripts
            .lock()
            .get(&stage)
            .cloned()
            .unwrap_or(JobScript::Succeed { polls: 0 })
    }

    fn take_launch_fault(&self, stage: Stage) -> bool {
        let mut faults = self.launch_faults.lock();
        match faults.get_mut(&stage) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn complete(&self, request: &LaunchRequest) {
        let Some(store) = &self.store else {
            return;
        };
        let stage = request.stage();
        store.insert(&request.output, format!("{stage} artifact").into_bytes());

        let document = match stage {
            Stage::Sfm => StageMetadata::new(stage, "succeeded").with_quality("registered_images", 148.0),
            Stage::Train => StageMetadata::new(stage, "succeeded").with_quality("psnr", 31.8),
            Stage::Compress => {
                StageMetadata::new(stage, "succeeded").with_quality("compression_ratio", 12.4)
            }
        };
        if let Ok(bytes) = document.to_bytes() {
            store.insert(&request.metadata_location, bytes);
        }

        if let Some(faults) = self.success_faults.lock().remove(&stage) {
            store.fail_next_reads(faults);
        }
    }
}

#[async_trait]
impl JobLauncher for FakeBackend {
    async fn launch(&self, request: &LaunchRequest) -> Result<JobHandle, LaunchError> {
        let name = request.job_name()?;
        let stage = request.stage();
        self.launches.lock().push(request.clone());

        if self.take_launch_fault(stage) {
            return Err(LaunchError::backend("connection reset by peer"));
        }
        if let JobScript::Reject { reason } = self.script_for(stage) {
            return Err(LaunchError::rejected(reason));
        }

        let fingerprint = request.fingerprint();
        match self.jobs.entry(name.as_str().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                if existing.get().fingerprint == fingerprint {
                    Ok(existing.get().handle.clone())
                } else {
                    Err(LaunchError::AlreadyExists {
                        job_name: name.as_str().to_string(),
                    })
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let run = self.next_run.fetch_add(1, Ordering::SeqCst) + 1;
                let handle = JobHandle::new(format!("fake-run-{run}"), name);
                slot.insert(FakeJob {
                    fingerprint,
                    handle: handle.clone(),
                    script: self.script_for(stage),
                    request: request.clone(),
                    polls_seen: 0,
                    finished: false,
                });
                Ok(handle)
            }
        }
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, LaunchError> {
        let name = handle.job_name.as_str();
        *self.status_counts.entry(name.to_string()).or_insert(0) += 1;

        let mut job = self
            .jobs
            .get_mut(name)
            .ok_or_else(|| LaunchError::backend(format!("unknown job '{name}'")))?;

        let status = match job.script.clone() {
            JobScript::Hang | JobScript::Reject { .. } => JobStatus::running(),
            JobScript::Succeed { polls } => {
                if job.polls_seen >= polls {
                    if !job.finished {
                        job.finished = true;
                        self.complete(&job.request);
                    }
                    JobStatus::succeeded()
                } else {
                    job.polls_seen += 1;
                    JobStatus::running()
                }
            }
            JobScript::Fail { polls, cause } => {
                if job.polls_seen >= polls {
                    JobStatus::failed(cause)
                } else {
                    job.polls_seen += 1;
                    JobStatus::running()
                }
            }
        };
        Ok(status)
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), LaunchError> {
        self.cancelled
            .lock()
            .push(handle.job_name.as_str().to_string());
        Ok(())
    }
}
