//! Sessions over SSH.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::ssh_key;
use russh::{Channel, ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;
use tokio::time;
use tracing::{debug, info, warn};

use super::{Connector, EphemeralKey, ExecOutput, HostKeyPolicy, RemoteSession, SessionOptions};
use crate::error::SessionError;
use crate::model::{AuthType, RemoteConfig};

/// Session with a remote host over SSH.
///
/// Files are transferred over an SFTP channel which is opened on first use.
pub struct SshSession {
    handle: Handle<SshHandler>,
    sftp: Option<SftpSession>,
    key: Option<EphemeralKey>,
    destination: String,
    closed: bool,
}

impl SshSession {
    /// Connect and authenticate.
    ///
    /// For key-based authentication, the key material is stored in an
    /// [`EphemeralKey`] which is removed when the session is closed or, if opening
    /// fails, before returning.
    pub async fn open(config: &RemoteConfig, options: &SessionOptions) -> Result<Self, SessionError> {
        config.validate()?;
        let destination = format!("{}@{}:{}", config.username, config.hostname, config.port);
        let key = match config.auth_type {
            AuthType::Key => Some(EphemeralKey::create(
                options.key_dir.as_deref(),
                config.private_key.as_deref().unwrap_or_default(),
            )?),
            AuthType::Password => None,
        };
        let private_key = key.as_ref().map(EphemeralKey::load).transpose()?;

        debug!("connecting to {destination}");
        let handler = SshHandler {
            host_key_policy: options.host_key_policy,
            hostname: config.hostname.clone(),
            port: config.port,
        };
        let mut handle = time::timeout(
            options.connect_timeout,
            client::connect(
                Arc::new(client::Config::default()),
                (config.hostname.as_str(), config.port),
                handler,
            ),
        )
        .await
        .map_err(|_| {
            SessionError::Connection(format!(
                "timed out after {} seconds connecting to {}:{}",
                options.connect_timeout.as_secs(),
                config.hostname,
                config.port
            ))
        })??;

        let authenticated = match private_key {
            Some(private_key) => {
                let hash_alg = private_key
                    .algorithm()
                    .is_rsa()
                    .then_some(ssh_key::HashAlg::Sha512);
                let key = PrivateKeyWithHashAlg::new(Arc::new(private_key), hash_alg)
                    .map_err(|error| SessionError::KeyMaterial(error.to_string()))?;
                handle
                    .authenticate_publickey(config.username.as_str(), key)
                    .await?
            }
            None => {
                handle
                    .authenticate_password(
                        config.username.as_str(),
                        config.password.as_deref().unwrap_or_default(),
                    )
                    .await?
            }
        };
        if !authenticated {
            return Err(SessionError::Authentication {
                username: config.username.clone(),
            });
        }
        info!("connected to {destination}");
        Ok(Self {
            handle,
            sftp: None,
            key,
            destination,
            closed: false,
        })
    }

    async fn sftp(&mut self) -> Result<&SftpSession, SessionError> {
        if self.sftp.is_none() {
            let channel = self.handle.channel_open_session().await?;
            channel.request_subsystem(true, "sftp").await?;
            self.sftp = Some(SftpSession::new(channel.into_stream()).await?);
        }
        self.sftp
            .as_ref()
            .ok_or_else(|| SessionError::Execution("no SFTP session".to_owned()))
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn exec(&mut self, command: &str, timeout: Duration) -> Result<ExecOutput, SessionError> {
        debug!("executing {command:?} on {}", self.destination);
        let handle = &self.handle;
        let run = async move {
            let mut channel = handle.channel_open_session().await?;
            channel.exec(true, command).await?;
            Ok::<_, SessionError>(collect_output(&mut channel).await)
        };
        let collected = bounded(timeout, run).await.inspect_err(|error| {
            if matches!(error, SessionError::Timeout(_)) {
                warn!("command {command:?} timed out after {} seconds", timeout.as_secs());
            }
        })?;
        let Some(exit_status) = collected.exit_status else {
            return Err(SessionError::Execution(
                "channel closed without exit status".to_owned(),
            ));
        };
        Ok(ExecOutput {
            exit_status: i64::from(exit_status),
            stdout: String::from_utf8_lossy(&collected.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&collected.stderr).into_owned(),
        })
    }

    async fn upload(&mut self, remote_path: &str, contents: &[u8]) -> Result<(), SessionError> {
        debug!("uploading {} bytes to {remote_path:?}", contents.len());
        let sftp = self.sftp().await?;
        let mut file = sftp.create(remote_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sftp = None;
        if let Some(key) = self.key.take() {
            key.remove();
        }
        debug!("disconnecting from {}", self.destination);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// Run `future` to completion, failing with [`SessionError::Timeout`] after `timeout`.
///
/// On timeout, the future is dropped together with any channel it has opened.
async fn bounded<T>(
    timeout: Duration,
    future: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    time::timeout(timeout, future)
        .await
        .unwrap_or(Err(SessionError::Timeout(timeout)))
}

/// Output collected from an exec channel.
#[derive(Debug, Default)]
struct CollectedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
}

async fn collect_output(channel: &mut Channel<Msg>) -> CollectedOutput {
    let mut collected = CollectedOutput::default();
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => collected.stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                collected.stderr.extend_from_slice(data)
            }
            ChannelMsg::ExitStatus { exit_status } => collected.exit_status = Some(exit_status),
            _ => {}
        }
    }
    collected
}

/// Opens [`SshSession`]s.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    pub options: SessionOptions,
}

impl SshConnector {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, config: &RemoteConfig) -> Result<SshSession, SessionError> {
        SshSession::open(config, &self.options).await
    }
}

struct SshHandler {
    host_key_policy: HostKeyPolicy,
    hostname: String,
    port: u16,
}

#[async_trait]
impl client::Handler for SshHandler {
    type Error = SessionError;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.host_key_policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::KnownHosts => {
                russh::keys::check_known_hosts(&self.hostname, self.port, server_public_key)
                    .map_err(|error| {
                        SessionError::Connection(format!("unable to check known hosts: {error}"))
                    })
            }
        }
    }
}
