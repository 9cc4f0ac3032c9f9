//! The pipeline's domain model.
//!
//! This module defines the fixed stage order, per-stage launch
//! configuration, and stage outcome types:
//! - [`Stage`], [`StageWindow`], and [`ArtifactKind`]
//! - [`StageDescriptor`], [`HardwareProfile`], and [`StagePlan`]
//! - [`StageStatus`] and [`StageResult`]

mod descriptor;
mod result;
mod stage;

pub use descriptor::{HardwareProfile, StageDescriptor, StagePlan};
pub use result::{StageResult, StageStatus};
pub use stage::{ArtifactKind, Stage, StageWindow};
