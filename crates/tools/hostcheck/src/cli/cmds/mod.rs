pub mod run_commands;
pub mod run_exec;
pub mod run_run;
pub mod run_script;
pub mod run_summary;
