//! The `summary` command.

use std::process::ExitCode;

use hostcheck_core::BatchContext;

use crate::cli::{args, report};
use crate::input;

/// Run the `summary` command.
pub fn run(cmd: &args::SummaryCommand) -> anyhow::Result<ExitCode> {
    let context = BatchContext {
        results: input::load_results(&cmd.results)?,
        ..BatchContext::default()
    };
    for result in &context.results {
        report::print_result(result);
    }
    report::print_summary(&context);
    Ok(ExitCode::SUCCESS)
}
