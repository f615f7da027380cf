//! The `script` command.

use std::process::ExitCode;

use anyhow::Context;

use hostcheck_core::synth::{self, SynthesisOptions};

use crate::cli::{args, load_config};
use crate::input;

/// Run the `script` command.
pub fn run(args: &args::Args, cmd: &args::ScriptCommand) -> anyhow::Result<ExitCode> {
    let config = load_config(args)?;
    let context = input::load_cases(&cmd.cases)?;
    let test_case = context
        .test_case(&cmd.test_case_id)
        .with_context(|| format!("no test case {:?} in {:?}", cmd.test_case_id, cmd.cases))?;
    let options = SynthesisOptions {
        quote_literals: cmd.quote_literals || config.execution.quote_literals,
    };
    print!("{}", synth::script_for(test_case, options));
    Ok(ExitCode::SUCCESS)
}
