//! Registry of in-flight runs.

use dashmap::DashMap;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::errors::SubmitError;

/// Tracks which job ids currently have a run in flight.
///
/// One job id, one live run: a second submission for an id that is still
/// registered is refused. Deregistration is tied to a guard's lifetime, so
/// a run that panics or is dropped mid-flight still frees its id.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveRuns {
    runs: Arc<DashMap<String, CancelToken>>,
}

impl ActiveRuns {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a run, handing back its guard and cancel token.
    pub(crate) fn begin(&self, job_id: &str) -> Result<RunGuard, SubmitError> {
        match self.runs.entry(job_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SubmitError::AlreadyRunning {
                job_id: job_id.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let token = CancelToken::new();
                slot.insert(token.clone());
                Ok(RunGuard {
                    runs: Arc::clone(&self.runs),
                    job_id: job_id.to_string(),
                    token,
                })
            }
        }
    }

    /// Requests cancellation of an in-flight run.
    ///
    /// Returns false if no run with that id is in flight.
    pub(crate) fn cancel(&self, job_id: &str, reason: impl Into<String>) -> bool {
        match self.runs.get(job_id) {
            Some(entry) => {
                entry.value().cancel(reason);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, job_id: &str) -> bool {
        self.runs.contains_key(job_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.runs.len()
    }
}

/// Keeps a run registered for as long as it lives.
#[derive(Debug)]
pub(crate) struct RunGuard {
    runs: Arc<DashMap<String, CancelToken>>,
    job_id: String,
    token: CancelToken,
}

impl RunGuard {
    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.remove(&self.job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_registration_is_refused() {
        let active = ActiveRuns::new();
        let _guard = active.begin("abc123").unwrap();

        let err = active.begin("abc123").unwrap_err();
        assert!(matches!(err, SubmitError::AlreadyRunning { .. }));
        assert!(active.contains("abc123"));
    }

    #[test]
    fn test_dropping_the_guard_frees_the_id() {
        let active = ActiveRuns::new();
        {
            let _guard = active.begin("abc123").unwrap();
            assert_eq!(active.len(), 1);
        }
        assert!(!active.contains("abc123"));
        assert!(active.begin("abc123").is_ok());
    }

    #[test]
    fn test_cancel_reaches_the_guard_token() {
        let active = ActiveRuns::new();
        let guard = active.begin("abc123").unwrap();

        assert!(active.cancel("abc123", "requested by artist"));
        assert!(guard.token().is_cancelled());
        assert_eq!(
            guard.token().reason(),
            Some("requested by artist".to_string())
        );
    }

    #[test]
    fn test_cancel_of_unknown_id_reports_false() {
        let active = ActiveRuns::new();
        assert!(!active.cancel("ghost", "nobody home"));
    }
}
