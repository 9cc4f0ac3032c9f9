//! Testing utilities for splatflow orchestrations.
//!
//! This module provides:
//! - A scriptable fake compute backend
//! - Harness and request fixtures wired against in-memory fakes
//! - Assertions for run reports and notification payloads

mod assertions;
mod backend;
mod fixtures;

pub use assertions::{
    assert_output_recorded, assert_payload_failure, assert_payload_success,
    assert_run_failed_at, assert_run_partially_succeeded, assert_run_succeeded,
    assert_stage_never_ran,
};
pub use backend::{FakeBackend, JobScript};
pub use fixtures::{
    fast_poll, fast_verify, init_tracing, sample_request, FailingNotificationSink, TestHarness,
};
