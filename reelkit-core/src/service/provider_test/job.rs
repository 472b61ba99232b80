//! Provider test batch job

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ProviderTestConfig,
    models::{ProviderId, ProviderMetadata, TestCaseOutput, TestJobState, TestResult, TestStage},
    provider::{ProviderApi, ProviderApiRegistry},
};

use super::{
    cases::{ProviderTestCase, STAGE_ONE, STAGE_TWO},
    gate::{Cancelled, PauseGate},
};

/// Results of the current testing session
///
/// Readers get a latest-value view through [`TestResults::subscribe`]; only
/// the job appends or replaces entries.
#[derive(Debug)]
pub struct TestResults {
    results: watch::Sender<Vec<TestResult>>,
}

impl Default for TestResults {
    fn default() -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self { results }
    }
}

impl TestResults {
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<TestResult>> {
        self.results.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<TestResult> {
        self.results.borrow().clone()
    }

    /// How many results exist for `provider_id` in this session
    #[must_use]
    pub fn times_tested(&self, provider_id: &ProviderId) -> usize {
        self.results
            .borrow()
            .iter()
            .filter(|r| &r.provider.id == provider_id)
            .count()
    }

    fn append(&self, result: TestResult) -> usize {
        let mut index = 0;
        self.results.send_modify(|results| {
            results.push(result);
            index = results.len() - 1;
        });
        index
    }

    fn append_output(&self, result_index: usize, output: TestCaseOutput) -> Option<usize> {
        let mut index = None;
        self.results.send_if_modified(|results| {
            let Some(result) = results.get_mut(result_index) else {
                return false;
            };
            result.outputs.push(output);
            index = Some(result.outputs.len() - 1);
            true
        });
        index
    }

    fn replace_output(&self, result_index: usize, output_index: usize, output: TestCaseOutput) {
        self.results.send_if_modified(|results| {
            match results
                .get_mut(result_index)
                .and_then(|r| r.outputs.get_mut(output_index))
            {
                Some(slot) => {
                    *slot = output;
                    true
                }
                None => false,
            }
        });
    }

    fn clear(&self) {
        self.results.send_if_modified(|results| {
            let had_results = !results.is_empty();
            results.clear();
            had_results
        });
    }
}

/// How a batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestRunOutcome {
    Completed,
    Cancelled,
}

/// Runs the case catalogue against a list of providers
///
/// Pausing takes effect at the next case boundary. Cancelling abandons the
/// remaining queue and returns the job to idle.
pub struct ProviderTestJob {
    registry: Arc<ProviderApiRegistry>,
    stage_one: Vec<ProviderTestCase>,
    stage_two: Vec<ProviderTestCase>,
    case_delay: Duration,
    gate: PauseGate,
    stage: watch::Sender<TestStage>,
    job_state: watch::Sender<TestJobState>,
    results: TestResults,
    run_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ProviderTestJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTestJob")
            .field("stage", &*self.stage.borrow())
            .field("job_state", &*self.job_state.borrow())
            .field("case_delay", &self.case_delay)
            .finish_non_exhaustive()
    }
}

impl ProviderTestJob {
    #[must_use]
    pub fn new(registry: Arc<ProviderApiRegistry>, config: &ProviderTestConfig) -> Self {
        let (stage, _) = watch::channel(TestStage::default());
        let (job_state, _) = watch::channel(TestJobState::Idle);
        Self {
            registry,
            stage_one: STAGE_ONE.to_vec(),
            stage_two: STAGE_TWO.to_vec(),
            case_delay: config.case_delay(),
            gate: PauseGate::new(),
            stage,
            job_state,
            results: TestResults::default(),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the case catalogue
    #[must_use]
    pub fn with_cases(
        mut self,
        stage_one: Vec<ProviderTestCase>,
        stage_two: Vec<ProviderTestCase>,
    ) -> Self {
        self.stage_one = stage_one;
        self.stage_two = stage_two;
        self
    }

    #[must_use]
    pub fn stage(&self) -> watch::Receiver<TestStage> {
        self.stage.subscribe()
    }

    #[must_use]
    pub fn job_state(&self) -> watch::Receiver<TestJobState> {
        self.job_state.subscribe()
    }

    #[must_use]
    pub const fn results(&self) -> &TestResults {
        &self.results
    }

    /// Clear the session results. Refused while a batch is running.
    pub fn clear_results(&self) -> bool {
        if *self.job_state.borrow() != TestJobState::Idle {
            return false;
        }
        self.results.clear();
        true
    }

    /// Pause before the next case. Returns false when nothing is running.
    pub fn pause(&self) -> bool {
        if *self.job_state.borrow() != TestJobState::Running || !self.gate.pause() {
            return false;
        }
        self.job_state.send_replace(TestJobState::Paused);
        info!("Provider test job paused");
        true
    }

    /// Release a paused batch. Returns false unless one is paused.
    pub fn resume(&self) -> bool {
        let resumed = self.job_state.send_if_modified(|state| {
            if *state == TestJobState::Paused {
                *state = TestJobState::Running;
                true
            } else {
                false
            }
        });
        if !resumed {
            return false;
        }
        self.gate.resume();
        info!("Provider test job resumed");
        true
    }

    pub fn cancel(&self) {
        if *self.job_state.borrow() != TestJobState::Idle {
            self.gate.cancel();
            info!("Provider test job cancelled");
        }
    }

    /// Test every provider in order
    ///
    /// Providers without a registered API are skipped. Only one batch runs at
    /// a time; a second call waits for the first to finish.
    pub async fn invoke(&self, providers: &[ProviderMetadata]) -> TestRunOutcome {
        let _running = self.run_lock.lock().await;
        self.gate.reset();
        self.job_state.send_replace(TestJobState::Running);
        info!(providers = providers.len(), "Provider test job started");

        let outcome = match self.run_providers(providers).await {
            Ok(()) => TestRunOutcome::Completed,
            Err(Cancelled) => TestRunOutcome::Cancelled,
        };

        // A pause that arrived during the last case has nothing left to hold
        self.gate.reset();
        self.job_state.send_replace(TestJobState::Idle);
        self.publish_stage(TestStage::Idle(None)).await;
        info!(outcome = ?outcome, "Provider test job finished");
        outcome
    }

    async fn run_providers(&self, providers: &[ProviderMetadata]) -> Result<(), Cancelled> {
        for provider in providers {
            let Some(api) = self.registry.get(&provider.id) else {
                debug!(provider_id = %provider.id, "Provider not loaded, skipping");
                continue;
            };

            let mut metadata = provider.clone();
            let previous_runs = self.results.times_tested(&provider.id);
            if previous_runs > 0 {
                metadata.name = format!("{} ({previous_runs})", provider.name);
            }
            let result_index = self.results.append(TestResult::new(metadata));

            self.publish_stage(TestStage::Stage1(provider.id.clone())).await;
            self.run_stage(&api, result_index, &self.stage_one).await?;

            self.publish_stage(TestStage::Stage2(provider.id.clone())).await;
            self.run_stage(&api, result_index, &self.stage_two).await?;

            self.publish_stage(TestStage::Done(provider.id.clone())).await;
            info!(provider_id = %provider.id, "Provider tested");
        }
        Ok(())
    }

    /// Publish `stage` and give its observers a turn before moving on
    async fn publish_stage(&self, stage: TestStage) {
        self.stage.send_replace(stage);
        tokio::task::yield_now().await;
    }

    async fn run_stage(
        &self,
        api: &Arc<dyn ProviderApi>,
        result_index: usize,
        cases: &[ProviderTestCase],
    ) -> Result<(), Cancelled> {
        for case in cases {
            self.gate.checkpoint().await?;

            let Some(output_index) = self
                .results
                .append_output(result_index, TestCaseOutput::running(case.name))
            else {
                warn!(result_index, "Test result disappeared, abandoning stage");
                return Ok(());
            };
            // Let observers see the placeholder before a quick case replaces it
            tokio::task::yield_now().await;

            let output = case.run(api.clone()).await;
            let passed = output.is_success();
            self.results.replace_output(result_index, output_index, output);

            if !passed && case.stop_test_on_failure {
                warn!(case = case.name, "Stopping stage after failed case");
                break;
            }

            self.gate.sleep(self.case_delay).await?;
        }
        Ok(())
    }
}
