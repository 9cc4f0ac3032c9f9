//! Run orchestration: submission, sequencing, cancellation, notification.

mod active;
mod pipeline;
mod report;

pub use pipeline::PipelineController;
pub use report::RunReport;
