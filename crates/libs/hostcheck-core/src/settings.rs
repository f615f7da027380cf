//! Execution defaults and settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::ExecutionMode;
use crate::session::HostKeyPolicy;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Default timeout for a single remote command in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Default timeout for establishing a connection in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Default delay between two test cases of a batch in milliseconds.
pub const DEFAULT_PACING_MILLIS: u64 = 500;

/// Directory on the remote host where test scripts are placed.
pub const REMOTE_SCRIPT_DIR: &str = "/tmp";

/// Interpreter used to invoke test scripts on the remote host.
pub const REMOTE_INTERPRETER: &str = "python3";

/// Settings controlling how test cases are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ExecutionSettings {
    /// Timeout for a single remote command in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
    /// Timeout for establishing the SSH connection in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Delay between two test cases in milliseconds.
    #[serde(default = "default_pacing")]
    pub pacing: u64,
    /// How to treat host keys that have not been seen before.
    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
    /// Whether to run a synthesized script or the extracted commands directly.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Embed commands and pass criteria as quoted literals instead of raw text.
    #[serde(default)]
    pub quote_literals: bool,
}

impl ExecutionSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing)
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            pacing: DEFAULT_PACING_MILLIS,
            host_key_policy: HostKeyPolicy::default(),
            mode: ExecutionMode::default(),
            quote_literals: false,
        }
    }
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_pacing() -> u64 {
    DEFAULT_PACING_MILLIS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: ExecutionSettings = toml::from_str("command-timeout = 5").unwrap();
        assert_eq!(settings.command_timeout(), Duration::from_secs(5));
        assert_eq!(settings.connect_timeout, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert_eq!(settings.pacing(), Duration::from_millis(500));
        assert_eq!(settings.host_key_policy, HostKeyPolicy::AcceptAny);
        assert_eq!(settings.mode, ExecutionMode::Script);
        assert!(!settings.quote_literals);
    }

    #[test]
    fn test_unknown_settings_are_rejected() {
        assert!(toml::from_str::<ExecutionSettings>("retries = 3").is_err());
    }
}
