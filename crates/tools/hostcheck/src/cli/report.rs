//! Human-readable output of results.

use colored::{ColoredString, Colorize};

use hostcheck_core::{BatchContext, TestResult, TestStatus};

fn colored_status(status: TestStatus) -> ColoredString {
    match status {
        TestStatus::Pass => status.as_str().green(),
        TestStatus::Fail => status.as_str().red(),
        TestStatus::NotRun => status.as_str().yellow(),
    }
}

/// Print the status of a result.
pub fn print_result(result: &TestResult) {
    eprintln!(
        "{} {} {}",
        colored_status(result.overall_status).bold(),
        result.test_case_id,
        result.title.bright_black()
    );
    if !result.notes.is_empty() {
        eprintln!("  {}", result.notes.bright_black());
    }
}

/// Print overall and per-requirement statistics.
pub fn print_summary(context: &BatchContext) {
    let statistics = context.statistics();
    eprintln!();
    eprintln!("{}", "Summary".bold());
    eprintln!("  Total:     {}", statistics.total);
    eprintln!("  Passed:    {}", statistics.passed.to_string().green());
    eprintln!("  Failed:    {}", statistics.failed.to_string().red());
    eprintln!("  Not Run:   {}", statistics.not_run.to_string().yellow());
    eprintln!("  Pass Rate: {:.1}%", statistics.pass_rate());

    let requirements = context.requirement_statistics();
    if requirements.is_empty() {
        return;
    }
    eprintln!();
    eprintln!(
        "{}",
        format!(
            "{:<20} {:>6} {:>6} {:>6} {:>8} {:>10}",
            "Requirement", "Total", "Passed", "Failed", "Not Run", "Pass Rate"
        )
        .bold()
    );
    for requirement in requirements {
        let statistics = requirement.statistics;
        eprintln!(
            "{:<20} {:>6} {:>6} {:>6} {:>8} {:>9.1}%",
            requirement.requirement_id,
            statistics.total,
            statistics.passed,
            statistics.failed,
            statistics.not_run,
            statistics.pass_rate()
        );
    }
}
