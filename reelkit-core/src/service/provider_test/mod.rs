//! Provider test runner
//!
//! Runs a fixed, two-stage battery of checks against live provider APIs as a
//! pausable batch job.

mod cases;
mod gate;
mod job;
mod runner;

pub use cases::{AssertionError, ProviderTestCase, TestFn, TestFuture, TestLogs, STAGE_ONE, STAGE_TWO};
pub use gate::{Cancelled, GateState, PauseGate};
pub use job::{ProviderTestJob, TestResults, TestRunOutcome};
pub use runner::run_test_case;
