//! Per-stage launch configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::stage::{ArtifactKind, Stage};

/// Hardware requested for a stage's remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Machine tier the backend should schedule on.
    pub tier: String,
    /// Number of GPUs requested.
    pub gpu_count: u32,
}

impl HardwareProfile {
    /// Creates a new hardware profile.
    #[must_use]
    pub fn new(tier: impl Into<String>, gpu_count: u32) -> Self {
        Self {
            tier: tier.into(),
            gpu_count,
        }
    }
}

/// Launch-time description of a single pipeline stage.
///
/// The artifact kinds are fixed by the stage's position in the pipeline;
/// hardware and timeout are configurable per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// The stage this descriptor launches.
    pub stage: Stage,
    /// The artifact kind the stage consumes.
    pub input_kind: ArtifactKind,
    /// The artifact kind the stage produces.
    pub output_kind: ArtifactKind,
    /// Hardware profile for the remote job.
    pub hardware: HardwareProfile,
    /// Wall-clock budget for the stage, launch to terminal status.
    pub timeout: Duration,
}

impl StageDescriptor {
    /// The built-in descriptor for a stage.
    #[must_use]
    pub fn default_for(stage: Stage) -> Self {
        let (hardware, timeout) = match stage {
            Stage::Sfm => (HardwareProfile::new("gpu-small", 1), Duration::from_secs(2 * 60 * 60)),
            Stage::Train => (HardwareProfile::new("gpu-large", 1), Duration::from_secs(4 * 60 * 60)),
            Stage::Compress => (HardwareProfile::new("cpu-medium", 0), Duration::from_secs(30 * 60)),
        };
        Self {
            stage,
            input_kind: stage.input_kind(),
            output_kind: stage.output_kind(),
            hardware,
            timeout,
        }
    }

    /// Overrides the stage timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the hardware profile.
    #[must_use]
    pub fn with_hardware(mut self, hardware: HardwareProfile) -> Self {
        self.hardware = hardware;
        self
    }
}

/// The full set of stage descriptors a controller launches from.
///
/// Always holds a descriptor for every pipeline stage, so lookups are
/// infallible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    descriptors: BTreeMap<Stage, StageDescriptor>,
}

impl StagePlan {
    /// Replaces the descriptor for its stage.
    pub fn set(&mut self, descriptor: StageDescriptor) {
        self.descriptors.insert(descriptor.stage, descriptor);
    }

    /// Builder form of [`StagePlan::set`].
    #[must_use]
    pub fn with(mut self, descriptor: StageDescriptor) -> Self {
        self.set(descriptor);
        self
    }

    /// The descriptor for `stage`.
    ///
    /// # Panics
    ///
    /// Never panics: the plan is constructed with every stage present and
    /// `set` only replaces entries.
    #[must_use]
    pub fn get(&self, stage: Stage) -> &StageDescriptor {
        &self.descriptors[&stage]
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        let descriptors = Stage::ALL
            .into_iter()
            .map(|stage| (stage, StageDescriptor::default_for(stage)))
            .collect();
        Self { descriptors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptors_follow_the_artifact_chain() {
        for stage in Stage::ALL {
            let descriptor = StageDescriptor::default_for(stage);
            assert_eq!(descriptor.stage, stage);
            assert_eq!(descriptor.input_kind, stage.input_kind());
            assert_eq!(descriptor.output_kind, stage.output_kind());
        }
    }

    #[test]
    fn test_default_plan_covers_every_stage() {
        let plan = StagePlan::default();
        for stage in Stage::ALL {
            assert_eq!(plan.get(stage).stage, stage);
        }
    }

    #[test]
    fn test_plan_override() {
        let fast = StageDescriptor::default_for(Stage::Train).with_timeout(Duration::from_secs(60));
        let plan = StagePlan::default().with(fast);
        assert_eq!(plan.get(Stage::Train).timeout, Duration::from_secs(60));
        assert_eq!(
            plan.get(Stage::Sfm).timeout,
            StageDescriptor::default_for(Stage::Sfm).timeout
        );
    }

    #[test]
    fn test_descriptor_builders() {
        let descriptor = StageDescriptor::default_for(Stage::Compress)
            .with_hardware(HardwareProfile::new("cpu-large", 0))
            .with_timeout(Duration::from_secs(90));
        assert_eq!(descriptor.hardware.tier, "cpu-large");
        assert_eq!(descriptor.timeout, Duration::from_secs(90));
    }
}
