//! The `exec` command.

use std::fs;
use std::process::ExitCode;

use anyhow::Context;

use hostcheck_core::TestStatus;

use crate::cli::{args, load_config, report, ssh_orchestrator};
use crate::config::env_var;
use crate::input;

/// Run the `exec` command.
pub async fn run(args: &args::Args, cmd: &args::ExecCommand) -> anyhow::Result<ExitCode> {
    let config = load_config(args)?;
    let remote = config.remote(&cmd.remote, env_var)?;
    let settings = config.execution(&cmd.execution, &cmd.remote);
    let context = input::load_cases(&cmd.cases)?;
    let test_case = context
        .test_case(&cmd.test_case_id)
        .with_context(|| format!("no test case {:?} in {:?}", cmd.test_case_id, cmd.cases))?;
    let custom_script = cmd
        .script
        .as_deref()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("unable to read script {path:?}"))
        })
        .transpose()?;

    let result = ssh_orchestrator(settings)
        .execute_single(test_case, &remote, custom_script.as_deref())
        .await;
    report::print_result(&result);
    let passed = result.overall_status == TestStatus::Pass;
    match &cmd.results {
        Some(path) => input::merge_result(path, result)?,
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    if passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
