//! Run context: the request, its validated form, and the data a run
//! accumulates.
//!
//! A [`PipelineRequest`] arrives from the outside; validating it yields the
//! [`PipelineContext`] threaded through the run. The context owns the
//! frozen [`EnvMap`], the per-stage [`HyperparameterMap`], and the
//! write-once [`StageOutputs`].

mod env;
mod execution;
mod identity;
mod outputs;
mod request;


pub use env::{EnvMap, HyperparameterMap};
pub use execution::{PipelineContext, RunStatus};
pub use identity::JobId;
pub use outputs::StageOutputs;
pub use request::PipelineRequest;
