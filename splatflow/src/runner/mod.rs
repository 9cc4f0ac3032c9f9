//! Single-stage execution: launch, poll, verify.

mod policy;
mod stage_runner;

pub use policy::{PollPolicy, VerifyPolicy};
pub use stage_runner::StageRunner;
