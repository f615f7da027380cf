//! Hostcheck executable.

use std::process::ExitCode;

use clap::Parser;

pub mod cli;
pub mod config;
pub mod input;

/// Entrypoint of the executable.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::args::Args::parse();
    cli::logging::init(args.verbose);
    cli::run(args).await
}
