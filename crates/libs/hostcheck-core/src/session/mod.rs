//! Authenticated sessions with remote hosts.
//!
//! [`RemoteSession`] is the seam between the orchestration logic and the transport.
//! [`SshSession`] implements it on top of SSH and SFTP.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{CommandResult, RemoteConfig};
use crate::settings::{ExecutionSettings, DEFAULT_CONNECT_TIMEOUT_SECS};

mod key;
mod ssh;

pub use key::EphemeralKey;
pub use ssh::{SshConnector, SshSession};

/// Output of a remote command which ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_status: i64,
    pub stdout: String,
    pub stderr: String,
}

/// Open session with a remote host.
///
/// Every call blocks until the remote side is done, there is at most one command in
/// flight at any time.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run a command and wait for it to exit.
    async fn exec(&mut self, command: &str, timeout: Duration) -> Result<ExecOutput, SessionError>;

    /// Write a file on the remote host, replacing any existing file.
    async fn upload(&mut self, remote_path: &str, contents: &[u8]) -> Result<(), SessionError>;

    /// Close the session and release all associated resources.
    ///
    /// Closing an already closed session does nothing.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Run a command, turning errors into a [`CommandResult`] with exit status `-1`.
    async fn run_command(&mut self, command: &str, timeout: Duration) -> CommandResult {
        match self.exec(command, timeout).await {
            Ok(output) => {
                CommandResult::new(command, output.exit_status, output.stdout, output.stderr)
            }
            Err(error) => {
                CommandResult::not_completed(command, format!("Error executing command: {error}"))
            }
        }
    }
}

/// Factory for sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: RemoteSession;

    /// Open a session with the host described by the given configuration.
    async fn connect(&self, config: &RemoteConfig) -> Result<Self::Session, SessionError>;
}

/// How to treat host keys of remote hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Trust every host key without verification.
    ///
    /// Convenient for freshly provisioned hosts but open to man-in-the-middle attacks.
    #[default]
    AcceptAny,
    /// Only trust host keys listed in the user's `known_hosts` file.
    KnownHosts,
}

/// Options for opening SSH sessions.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    /// Directory to create the ephemeral private key directory in.
    ///
    /// Defaults to the system's temporary directory.
    pub key_dir: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            host_key_policy: HostKeyPolicy::default(),
            key_dir: None,
        }
    }
}

impl From<&ExecutionSettings> for SessionOptions {
    fn from(settings: &ExecutionSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
            host_key_policy: settings.host_key_policy,
            key_dir: None,
        }
    }
}
