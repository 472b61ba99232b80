//! Single test case execution

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{TestCaseOutput, TestStatus};

use super::cases::{AssertionError, TestLogs};

/// Run one assertion and turn its outcome into a finished `TestCaseOutput`
///
/// Never fails: provider errors, failed assertions and panics all become
/// outputs. `ProviderError::NotImplemented` is reported as `NotImplemented`,
/// everything else as `Failure`.
pub async fn run_test_case<F>(name: &str, assertion: F) -> TestCaseOutput
where
    F: Future<Output = Result<TestLogs, AssertionError>>,
{
    let started = Instant::now();
    let outcome = AssertUnwindSafe(assertion).catch_unwind().await;
    let time_taken = started.elapsed();

    let (status, short_log, full_log) = match outcome {
        Ok(Ok(logs)) => (TestStatus::Success, logs.short_log, logs.full_log),
        Ok(Err(e)) => {
            let status = if e.is_not_implemented() {
                TestStatus::NotImplemented
            } else {
                TestStatus::Failure
            };
            let full_log = match &e {
                AssertionError::Failed {
                    full_log: Some(full_log),
                    ..
                } => full_log.clone(),
                _ => format!("{e:#?}"),
            };
            (status, e.to_string(), full_log)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            (
                TestStatus::Failure,
                format!("Test case panicked: {message}"),
                message,
            )
        }
    };

    debug!(
        case = name,
        status = %status,
        elapsed_ms = time_taken.as_millis(),
        "Test case finished"
    );

    TestCaseOutput {
        status,
        name: name.to_string(),
        time_taken,
        short_log: Some(short_log),
        full_log: Some(full_log),
    }
}
