//! Implementation of the CLI.

use std::process::ExitCode;

use hostcheck_core::session::SessionOptions;
use hostcheck_core::{ExecutionSettings, Orchestrator, SshConnector};

use crate::config::Config;

mod cmds;
mod progress;
mod report;

pub mod args;
pub mod logging;

/// Run Hostcheck with the provided command line arguments.
pub async fn run(args: args::Args) -> anyhow::Result<ExitCode> {
    match &args.cmd {
        args::Command::Run(cmd) => cmds::run_run::run(&args, cmd).await,
        args::Command::Exec(cmd) => cmds::run_exec::run(&args, cmd).await,
        args::Command::Script(cmd) => cmds::run_script::run(&args, cmd),
        args::Command::Commands(cmd) => cmds::run_commands::run(cmd),
        args::Command::Summary(cmd) => cmds::run_summary::run(cmd),
    }
}

/// Load the configuration file given on the command line.
fn load_config(args: &args::Args) -> anyhow::Result<Config> {
    Config::load(args.config.as_deref())
}

/// Create an orchestrator connecting over SSH.
fn ssh_orchestrator(settings: ExecutionSettings) -> Orchestrator<SshConnector> {
    let connector = SshConnector::new(SessionOptions::from(&settings));
    Orchestrator::new(connector, settings)
}
