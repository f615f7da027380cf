//! Definition of the command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use hostcheck_core::ExecutionMode;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(author, about = None, long_about = None)]
pub struct Args {
    /// Path to the `hostcheck.toml` configuration file.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Log debug messages.
    #[clap(short, long)]
    pub verbose: bool,
    /// The command to execute.
    #[clap(subcommand)]
    pub cmd: Command,
}

/// Commands of the CLI.
#[derive(Debug, Parser)]
pub enum Command {
    /// Execute all test cases of a file.
    Run(RunCommand),
    /// Execute a single test case.
    Exec(ExecCommand),
    /// Print the script of a test case.
    Script(ScriptCommand),
    /// Print the commands of each test case.
    Commands(CommandsCommand),
    /// Summarize a results file.
    Summary(SummaryCommand),
}

/// Options overriding the `[remote]` table of the configuration file.
#[derive(Debug, Default, Parser)]
pub struct RemoteOpts {
    /// Hostname or IP address of the remote host.
    #[clap(long)]
    pub host: Option<String>,
    /// SSH port of the remote host.
    #[clap(long)]
    pub port: Option<String>,
    /// User to log in as.
    #[clap(long)]
    pub user: Option<String>,
    /// Authenticate with the private key in the given file.
    #[clap(long)]
    pub key_file: Option<PathBuf>,
    /// Only trust hosts listed in the `known_hosts` file.
    #[clap(long)]
    pub known_hosts: bool,
}

/// Options overriding the `[execution]` table of the configuration file.
#[derive(Debug, Default, Parser)]
pub struct ExecutionOpts {
    /// How to execute test cases.
    #[clap(long)]
    pub mode: Option<ModeArg>,
    /// Timeout for a single remote command in seconds.
    #[clap(long)]
    pub timeout: Option<u64>,
    /// Embed commands as escaped string literals into scripts.
    #[clap(long)]
    pub quote_literals: bool,
}

/// Execution mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Run a script per test case.
    Script,
    /// Run the commands of each test case directly.
    Commands,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Script => ExecutionMode::Script,
            ModeArg::Commands => ExecutionMode::Commands,
        }
    }
}

/// The `run` command.
#[derive(Debug, Parser)]
pub struct RunCommand {
    /// File with the test cases.
    pub cases: PathBuf,
    /// Write the results to the given file instead of stdout.
    #[clap(long, short)]
    pub output: Option<PathBuf>,
    /// Exit successfully even if test cases did not pass.
    #[clap(long)]
    pub no_fail: bool,
    #[clap(flatten)]
    pub remote: RemoteOpts,
    #[clap(flatten)]
    pub execution: ExecutionOpts,
}

/// The `exec` command.
#[derive(Debug, Parser)]
pub struct ExecCommand {
    /// File with the test cases.
    pub cases: PathBuf,
    /// Id of the test case to execute.
    pub test_case_id: String,
    /// Run the given script instead of the script of the test case.
    #[clap(long)]
    pub script: Option<PathBuf>,
    /// Results file to record the result in.
    #[clap(long)]
    pub results: Option<PathBuf>,
    #[clap(flatten)]
    pub remote: RemoteOpts,
    #[clap(flatten)]
    pub execution: ExecutionOpts,
}

/// The `script` command.
#[derive(Debug, Parser)]
pub struct ScriptCommand {
    /// File with the test cases.
    pub cases: PathBuf,
    /// Id of the test case.
    pub test_case_id: String,
    /// Embed commands as escaped string literals.
    #[clap(long)]
    pub quote_literals: bool,
}

/// The `commands` command.
#[derive(Debug, Parser)]
pub struct CommandsCommand {
    /// File with the test cases.
    pub cases: PathBuf,
}

/// The `summary` command.
#[derive(Debug, Parser)]
pub struct SummaryCommand {
    /// Results file.
    pub results: PathBuf,
}
