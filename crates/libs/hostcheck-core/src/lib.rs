//! Turns host verification test cases into scripts, runs them on remote hosts over
//! SSH, and reduces the outcomes into verdicts.
//!
//! The pipeline for every test case is [`extract`] → [`synth`] → [`runner`] (over a
//! [`session`]) → [`verdict`], sequenced by the [`batch`] orchestrator.

pub mod batch;
pub mod error;
pub mod extract;
pub mod model;
pub mod runner;
pub mod session;
pub mod settings;
pub mod synth;
pub mod verdict;

pub use batch::{BatchState, ExecutionMode, NoProgress, Orchestrator, ProgressSink};
pub use error::{BatchError, ConfigError, SessionError};
pub use model::{
    AuthType, BatchContext, CommandResult, Priority, RemoteConfig, Requirement, TestCase,
    TestResult, TestStatus,
};
pub use session::{Connector, RemoteSession, SshConnector, SshSession};
pub use settings::ExecutionSettings;
