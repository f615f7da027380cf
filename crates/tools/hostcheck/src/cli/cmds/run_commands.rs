//! The `commands` command.

use std::process::ExitCode;

use colored::Colorize;

use hostcheck_core::extract;

use crate::cli::args;
use crate::input;

/// Run the `commands` command.
pub fn run(cmd: &args::CommandsCommand) -> anyhow::Result<ExitCode> {
    let context = input::load_cases(&cmd.cases)?;
    for test_case in &context.test_cases {
        let (source, commands) = extract::resolve(test_case);
        println!(
            "{} {} {}",
            test_case.id().unwrap_or_default().blue(),
            test_case.title,
            format!("({source})").bright_black()
        );
        for command in commands {
            println!("  {command}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
