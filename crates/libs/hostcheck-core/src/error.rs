//! Error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Remote configuration is incomplete or invalid.
///
/// Detected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("SSH hostname is required")]
    MissingHostname,
    #[error("SSH username is required")]
    MissingUsername,
    #[error("a password is required for password authentication")]
    MissingPassword,
    #[error("a private key is required for key authentication")]
    MissingPrivateKey,
    #[error("invalid SSH port {0:?}")]
    InvalidPort(String),
}

/// Error of a remote session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The remote host rejected the credentials.
    #[error("authentication failed for user {username:?}")]
    Authentication { username: String },
    /// The SSH protocol failed.
    #[error("SSH protocol error: {0}")]
    Protocol(#[source] russh::Error),
    /// The host could not be reached or the connection broke down.
    #[error("connection error: {0}")]
    Connection(String),
    /// A remote command did not finish in time.
    #[error("command timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    /// A remote command could not be executed to completion.
    #[error("remote execution failed: {0}")]
    Execution(String),
    /// The provided private key could not be used.
    #[error("invalid private key: {0}")]
    KeyMaterial(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Short name of the error kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Authentication { .. } => "authentication",
            SessionError::Protocol(_) => "protocol",
            SessionError::Connection(_) => "connection",
            SessionError::Timeout(_) => "timeout",
            SessionError::Execution(_) | SessionError::Sftp(_) => "execution",
            SessionError::KeyMaterial(_) => "key-material",
            SessionError::Config(_) => "config",
            SessionError::Io(_) => "io",
        }
    }
}

impl From<russh::Error> for SessionError {
    fn from(error: russh::Error) -> Self {
        match error {
            russh::Error::IO(error) => SessionError::Connection(error.to_string()),
            russh::Error::UnknownKey => {
                SessionError::Connection("host key of the remote host is not trusted".to_owned())
            }
            russh::Error::Disconnect => {
                SessionError::Connection("remote host closed the connection".to_owned())
            }
            error => SessionError::Protocol(error),
        }
    }
}

/// Error aborting a whole batch.
///
/// Per-test-case failures never surface here, they become failed results.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("incomplete SSH configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("unable to open SSH session: {0}")]
    Connection(#[from] SessionError),
}
