//! The `run` command.

use std::process::ExitCode;

use anyhow::Context;
use tracing::info;

use hostcheck_core::TestStatus;

use crate::cli::progress::BarProgress;
use crate::cli::{args, load_config, report, ssh_orchestrator};
use crate::config::env_var;
use crate::input;

/// Run the `run` command.
pub async fn run(args: &args::Args, cmd: &args::RunCommand) -> anyhow::Result<ExitCode> {
    let config = load_config(args)?;
    let remote = config.remote(&cmd.remote, env_var)?;
    let settings = config.execution(&cmd.execution, &cmd.remote);
    let mut context = input::load_cases(&cmd.cases)?;
    info!(
        "loaded {} test cases from {:?}",
        context.test_cases.len(),
        cmd.cases
    );

    let orchestrator = ssh_orchestrator(settings);
    let mut progress = BarProgress::new(context.test_cases.len());
    let outcome = orchestrator
        .execute_context(&mut context, &remote, &mut progress)
        .await;
    progress.finish();
    outcome.with_context(|| format!("unable to execute test cases on {:?}", remote.hostname))?;

    for result in &context.results {
        report::print_result(result);
    }
    report::print_summary(&context);
    match &cmd.output {
        Some(path) => input::write_results(path, &context.results)?,
        None => println!("{}", serde_json::to_string_pretty(&context.results)?),
    }

    let all_passed = context
        .results
        .iter()
        .all(|result| result.overall_status == TestStatus::Pass);
    if all_passed || cmd.no_fail {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
