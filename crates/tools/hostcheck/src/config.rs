//! Configuration of the CLI.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use hostcheck_core::model::parse_port;
use hostcheck_core::session::HostKeyPolicy;
use hostcheck_core::{AuthType, ExecutionSettings, RemoteConfig};

use crate::cli::args::{ExecutionOpts, RemoteOpts};

/// Configuration file used if no other file is given.
pub const DEFAULT_CONFIG_FILE: &str = "hostcheck.toml";

/// Environment variable with the SSH password.
pub const PASSWORD_ENV: &str = "HOSTCHECK_PASSWORD";

/// Environment variable with the SSH private key.
pub const PRIVATE_KEY_ENV: &str = "HOSTCHECK_PRIVATE_KEY";

/// Contents of a `hostcheck.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Connection details of the remote host.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// How test cases are executed.
    #[serde(default)]
    pub execution: ExecutionSettings,
}

impl Config {
    /// Load the configuration from the given file.
    ///
    /// Without a path, [`DEFAULT_CONFIG_FILE`] is loaded if it exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read configuration file {path:?}"))?;
        toml::from_str(&text).with_context(|| format!("invalid configuration file {path:?}"))
    }

    /// Connection details with command line options and environment applied.
    pub fn remote(
        &self,
        opts: &RemoteOpts,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<RemoteConfig> {
        let mut remote = self.remote.clone();
        if let Some(host) = &opts.host {
            remote.hostname = host.clone();
        }
        if let Some(port) = &opts.port {
            remote.port = parse_port(port)?;
        }
        if let Some(user) = &opts.user {
            remote.username = user.clone();
        }
        if let Some(password) = env(PASSWORD_ENV) {
            remote.password = Some(password);
        }
        if let Some(private_key) = env(PRIVATE_KEY_ENV) {
            remote.private_key = Some(private_key);
        }
        if let Some(key_file) = &opts.key_file {
            let private_key = fs::read_to_string(key_file)
                .with_context(|| format!("unable to read private key {key_file:?}"))?;
            remote.private_key = Some(private_key);
            remote.auth_type = AuthType::Key;
        }
        Ok(remote)
    }

    /// Execution settings with command line options applied.
    pub fn execution(&self, opts: &ExecutionOpts, remote: &RemoteOpts) -> ExecutionSettings {
        let mut settings = self.execution.clone();
        if let Some(mode) = opts.mode {
            settings.mode = mode.into();
        }
        if let Some(timeout) = opts.timeout {
            settings.command_timeout = timeout;
        }
        settings.quote_literals |= opts.quote_literals;
        if remote.known_hosts {
            settings.host_key_policy = HostKeyPolicy::KnownHosts;
        }
        settings
    }
}

/// Read an environment variable, ignoring empty values.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hostcheck_core::ExecutionMode;
    use indoc::indoc;

    use super::*;
    use crate::cli::args::ModeArg;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            indoc! {r#"
                [remote]
                hostname = "192.0.2.10"
                port = "2222"
                username = "admin"
                auth_type = "key"

                [execution]
                command-timeout = 10
                mode = "commands"
            "#}
            .as_bytes(),
        )
        .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.remote.hostname, "192.0.2.10");
        assert_eq!(config.remote.port, 2222);
        assert_eq!(config.remote.auth_type, AuthType::Key);
        assert_eq!(config.execution.command_timeout, 10);
        assert_eq!(config.execution.mode, ExecutionMode::Commands);
        assert_eq!(config.execution.pacing, 500);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[remote]\nhost = \"example.org\"\n").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_options_override_file() {
        let config = Config {
            remote: RemoteConfig::with_password("192.0.2.10", "admin", "from-file"),
            ..Config::default()
        };
        let opts = RemoteOpts {
            host: Some("192.0.2.20".to_owned()),
            port: Some("2200".to_owned()),
            ..RemoteOpts::default()
        };
        let remote = config
            .remote(&opts, |name| {
                (name == PASSWORD_ENV).then(|| "from-env".to_owned())
            })
            .unwrap();
        assert_eq!(remote.hostname, "192.0.2.20");
        assert_eq!(remote.port, 2200);
        assert_eq!(remote.username, "admin");
        assert_eq!(remote.password.as_deref(), Some("from-env"));

        let opts = RemoteOpts {
            port: Some("ssh".to_owned()),
            ..RemoteOpts::default()
        };
        assert!(config.remote(&opts, no_env).is_err());
    }

    #[test]
    fn test_key_file_selects_key_authentication() {
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        key_file.write_all(b"key material\n").unwrap();
        let opts = RemoteOpts {
            key_file: Some(key_file.path().to_owned()),
            ..RemoteOpts::default()
        };
        let remote = Config::default().remote(&opts, no_env).unwrap();
        assert_eq!(remote.auth_type, AuthType::Key);
        assert_eq!(remote.private_key.as_deref(), Some("key material\n"));
    }

    #[test]
    fn test_execution_options() {
        let opts = ExecutionOpts {
            mode: Some(ModeArg::Commands),
            timeout: Some(5),
            quote_literals: true,
        };
        let remote = RemoteOpts {
            known_hosts: true,
            ..RemoteOpts::default()
        };
        let settings = Config::default().execution(&opts, &remote);
        assert_eq!(settings.mode, ExecutionMode::Commands);
        assert_eq!(settings.command_timeout, 5);
        assert!(settings.quote_literals);
        assert_eq!(settings.host_key_policy, HostKeyPolicy::KnownHosts);
    }
}
