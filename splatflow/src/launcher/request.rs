//! Launch requests.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::context::EnvMap;
use crate::errors::NameError;
use crate::naming::JobName;
use crate::stages::{Stage, StageDescriptor};
use crate::store::Location;

/// Everything a backend needs to start one stage's remote job.
///
/// The request is self-describing: the job name derives from
/// `{name_root}-{stage suffix}` and the [`LaunchRequest::fingerprint`]
/// canonically hashes the launch content, which is what lets backends tell
/// an idempotent retry from a genuine name collision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchRequest {
    /// The stage being launched.
    pub descriptor: StageDescriptor,
    /// The run's job id; root of the derived job name.
    pub name_root: String,
    /// Where the job reads its input.
    pub input: Location,
    /// Where the job must write its primary output.
    pub output: Location,
    /// Where the job must write its metadata document.
    pub metadata_location: Location,
    /// The stage's hyperparameter slice, passed through verbatim.
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
    /// The run's environment, attached verbatim.
    pub environment: EnvMap,
}

impl LaunchRequest {
    /// The stage this request launches.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.descriptor.stage
    }

    /// Derives the unique job name for this request.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] when the name root is invalid.
    pub fn job_name(&self) -> Result<JobName, NameError> {
        JobName::derive(&self.name_root, self.descriptor.stage)
    }

    /// A canonical content hash of the launch.
    ///
    /// Two requests with the same fingerprint describe the same job; a
    /// backend seeing a known name with a matching fingerprint returns the
    /// existing handle instead of starting a second job.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let params = serde_json::to_string(&self.hyperparameters).unwrap_or_default();
        let env = serde_json::to_string(&self.environment).unwrap_or_default();
        let combined = [
            self.name_root.as_str(),
            self.descriptor.stage.name(),
            self.input.as_str(),
            self.output.as_str(),
            params.as_str(),
            env.as_str(),
        ]
        .join(":");

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}
