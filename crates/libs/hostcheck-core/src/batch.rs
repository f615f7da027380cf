//! Sequencing of test cases over a remote session.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::BatchError;
use crate::extract;
use crate::model::{
    assign_test_case_ids, BatchContext, RemoteConfig, TestCase, TestResult, TestStatus, UNKNOWN,
};
use crate::runner;
use crate::session::{Connector, RemoteSession};
use crate::settings::ExecutionSettings;
use crate::synth::{self, SynthesisOptions};
use crate::verdict;

/// How test cases are executed on the remote host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Upload a script per test case and take its exit status as verdict.
    #[default]
    Script,
    /// Run the extracted commands directly and reduce their results.
    Commands,
}

/// State of a batch.
///
/// Every batch starts out [`Idle`](BatchState::Idle), only transitions out of it are
/// reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BatchState {
    #[default]
    Idle,
    Connecting,
    Synthesizing,
    Uploading,
    Executing,
    Reducing,
    Done,
    ConnectionFailed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchState::Idle => "idle",
            BatchState::Connecting => "connecting",
            BatchState::Synthesizing => "synthesizing",
            BatchState::Uploading => "uploading",
            BatchState::Executing => "executing",
            BatchState::Reducing => "reducing",
            BatchState::Done => "done",
            BatchState::ConnectionFailed => "connection failed",
        })
    }
}

/// Receiver of progress updates of a batch.
pub trait ProgressSink {
    /// Called after every test case with the number of completed test cases.
    fn progress(&mut self, completed: usize, total: usize);

    /// Called on every state transition.
    fn state(&mut self, state: BatchState, test_case_id: Option<&str>) {
        let _ = (state, test_case_id);
    }
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn progress(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Progress sink discarding all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _: usize, _: usize) {}
}

/// Runs test cases on remote hosts, strictly one after another.
#[derive(Debug, Clone)]
pub struct Orchestrator<C> {
    connector: C,
    settings: ExecutionSettings,
}

impl<C: Connector> Orchestrator<C> {
    pub fn new(connector: C, settings: ExecutionSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            quote_literals: self.settings.quote_literals,
        }
    }

    /// Execute all test cases over a single session, in input order.
    ///
    /// Test cases without id are assigned one, see [`assign_test_case_ids`]. Failures
    /// of individual test cases are recorded as failed results. Only an incomplete
    /// configuration or a failure to connect aborts the batch, in which case no
    /// results are produced.
    pub async fn execute_all<P: ProgressSink>(
        &self,
        test_cases: &[TestCase],
        config: &RemoteConfig,
        progress: &mut P,
    ) -> Result<Vec<TestResult>, BatchError> {
        config.validate()?;
        if test_cases.is_empty() {
            warn!("no test cases to execute");
            return Ok(Vec::new());
        }
        let mut test_cases = test_cases.to_vec();
        assign_test_case_ids(&mut test_cases);

        transition(progress, BatchState::Connecting, None);
        let mut session = match self.connector.connect(config).await {
            Ok(session) => session,
            Err(error) => {
                error!("unable to connect to {}: {error}", config.hostname);
                transition(progress, BatchState::ConnectionFailed, None);
                return Err(BatchError::Connection(error));
            }
        };

        let total = test_cases.len();
        info!("executing {total} test cases on {}", config.hostname);
        let mut results = Vec::with_capacity(total);
        for (idx, test_case) in test_cases.iter().enumerate() {
            if idx > 0 && !self.settings.pacing().is_zero() {
                time::sleep(self.settings.pacing()).await;
            }
            let result = self
                .execute_isolated(&mut session, test_case, None, progress)
                .await;
            info!(
                "test case {} finished with status {}",
                result.test_case_id, result.overall_status
            );
            results.push(result);
            progress.progress(idx + 1, total);
        }

        if let Err(error) = session.close().await {
            warn!("unable to close session with {}: {error}", config.hostname);
        }
        transition(progress, BatchState::Done, None);
        Ok(results)
    }

    /// Execute the test cases of the given context and record their results.
    ///
    /// Ids assigned to test cases are stored in the context.
    pub async fn execute_context<P: ProgressSink>(
        &self,
        context: &mut BatchContext,
        config: &RemoteConfig,
        progress: &mut P,
    ) -> Result<(), BatchError> {
        assign_test_case_ids(&mut context.test_cases);
        let results = self
            .execute_all(&context.test_cases, config, progress)
            .await?;
        context.record_all(results);
        Ok(())
    }

    /// Execute a single test case over a session of its own.
    ///
    /// If given, `custom_script` replaces the script of the test case. Incomplete
    /// configurations and connection failures result in a failed result.
    pub async fn execute_single(
        &self,
        test_case: &TestCase,
        config: &RemoteConfig,
        custom_script: Option<&str>,
    ) -> TestResult {
        let mut test_case = test_case.clone();
        if test_case.id().is_none() {
            test_case.test_case_id = Some(UNKNOWN.to_owned());
        }
        if let Err(error) = config.validate() {
            return TestResult::for_test_case(
                &test_case,
                TestStatus::Fail,
                format!("Please provide complete SSH connection details: {error}"),
            );
        }
        let mut progress = NoProgress;
        transition(&mut progress, BatchState::Connecting, test_case.id());
        let mut session = match self.connector.connect(config).await {
            Ok(session) => session,
            Err(error) => {
                error!("unable to connect to {}: {error}", config.hostname);
                transition(&mut progress, BatchState::ConnectionFailed, test_case.id());
                return TestResult::for_test_case(
                    &test_case,
                    TestStatus::Fail,
                    format!("Connection error: {error}"),
                );
            }
        };
        let result = self
            .execute_isolated(&mut session, &test_case, custom_script, &mut progress)
            .await;
        if let Err(error) = session.close().await {
            warn!("unable to close session with {}: {error}", config.hostname);
        }
        transition(&mut progress, BatchState::Done, test_case.id());
        result
    }

    /// Execute a test case, turning a panic into a failed result.
    async fn execute_isolated<S: RemoteSession, P: ProgressSink>(
        &self,
        session: &mut S,
        test_case: &TestCase,
        custom_script: Option<&str>,
        progress: &mut P,
    ) -> TestResult {
        let execution = self.execute_case(session, test_case, custom_script, progress);
        match AssertUnwindSafe(execution).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("execution of test case {:?} panicked: {message}", test_case.id());
                TestResult::for_test_case(test_case, TestStatus::Fail, format!("Error: {message}"))
            }
        }
    }

    async fn execute_case<S: RemoteSession, P: ProgressSink>(
        &self,
        session: &mut S,
        test_case: &TestCase,
        custom_script: Option<&str>,
        progress: &mut P,
    ) -> TestResult {
        let id = test_case.id().unwrap_or(UNKNOWN);
        let timeout = self.settings.command_timeout();
        match (self.settings.mode, custom_script) {
            (ExecutionMode::Commands, None) => {
                transition(progress, BatchState::Executing, Some(id));
                let mut commands_executed = Vec::new();
                for command in extract::extract(test_case) {
                    commands_executed.push(session.run_command(&command, timeout).await);
                }
                transition(progress, BatchState::Reducing, Some(id));
                let verdict = verdict::reduce(test_case, &commands_executed);
                let mut result = TestResult::for_test_case(test_case, verdict.status, verdict.notes);
                result.commands_executed = commands_executed;
                result
            }
            // A custom script is run in either mode.
            (_, custom_script) => {
                transition(progress, BatchState::Synthesizing, Some(id));
                let script = match custom_script {
                    Some(script) => script.to_owned(),
                    None => synth::script_for(test_case, self.synthesis_options()),
                };
                let remote_path = runner::remote_script_path(id);
                transition(progress, BatchState::Uploading, Some(id));
                let outcome = runner::run_script(session, &remote_path, &script, timeout, || {
                    transition(progress, BatchState::Executing, Some(id))
                })
                .await;
                transition(progress, BatchState::Reducing, Some(id));
                let verdict = verdict::from_script(&outcome);
                let mut result = TestResult::for_test_case(test_case, verdict.status, verdict.notes);
                result.commands_executed.push(outcome.into_command_result());
                result.script = Some(script);
                result
            }
        }
    }
}

fn transition<P: ProgressSink>(progress: &mut P, state: BatchState, test_case_id: Option<&str>) {
    match test_case_id {
        Some(id) => debug!("batch is {state} ({id})"),
        None => debug!("batch is {state}"),
    }
    progress.state(state, test_case_id);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(
            serde_json::to_string(&ExecutionMode::Commands).unwrap(),
            "\"commands\""
        );
        assert_eq!(
            serde_json::from_str::<ExecutionMode>("\"script\"").unwrap(),
            ExecutionMode::Script
        );
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "boom");
        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(panic.as_ref()), "bang");
        let panic: Box<dyn Any + Send> = Box::new(3);
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }

    #[test]
    fn test_closures_are_progress_sinks() {
        let mut updates = Vec::new();
        let mut sink = |completed: usize, total: usize| updates.push((completed, total));
        transition(&mut sink, BatchState::Connecting, None);
        sink.progress(1, 2);
        assert_eq!(updates, [(1, 2)]);
    }
}
