//! Reduction of command results into verdicts.

use crate::model::{CommandResult, TestCase, TestStatus};
use crate::runner::ScriptOutcome;

/// Status and explanatory notes of a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: TestStatus,
    pub notes: String,
}

impl Verdict {
    fn new(status: TestStatus, notes: impl Into<String>) -> Self {
        Self {
            status,
            notes: notes.into(),
        }
    }
}

/// Reduce the results of the discrete commands of a test case.
///
/// Failing commands take precedence over the pass criteria: if any command exited
/// with a non-zero status, the test case fails no matter what the output was.
pub fn reduce(test_case: &TestCase, results: &[CommandResult]) -> Verdict {
    if results.is_empty() {
        return Verdict::new(TestStatus::NotRun, "No commands were executed");
    }
    let failed = results
        .iter()
        .filter(|result| !result.succeeded())
        .map(|result| result.command.as_str())
        .collect::<Vec<_>>();
    if !failed.is_empty() {
        return Verdict::new(
            TestStatus::Fail,
            format!("Failed commands: {}", failed.join(", ")),
        );
    }
    let Some(criteria) = test_case.pass_criteria() else {
        return Verdict::new(TestStatus::Pass, "");
    };
    let outputs = results
        .iter()
        .map(|result| result.output.as_str())
        .collect::<Vec<_>>();
    if outputs.iter().any(|output| output.contains(criteria)) || outputs.join("\n").contains(criteria)
    {
        Verdict::new(TestStatus::Pass, "")
    } else {
        Verdict::new(
            TestStatus::Fail,
            format!("Pass criteria not met: {criteria}"),
        )
    }
}

/// Verdict of a script which embeds the pass/fail decision in its exit status.
pub fn from_script(outcome: &ScriptOutcome) -> Verdict {
    match outcome.exit_status {
        0 => Verdict::new(TestStatus::Pass, ""),
        CommandResult::NOT_COMPLETED => {
            Verdict::new(TestStatus::Fail, format!("Error: {}", outcome.error))
        }
        _ => Verdict::new(TestStatus::Fail, outcome.error.clone()),
    }
}
