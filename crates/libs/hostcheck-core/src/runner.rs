//! Running scripts on remote hosts.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SessionError;
use crate::model::CommandResult;
use crate::session::RemoteSession;
use crate::settings::{REMOTE_INTERPRETER, REMOTE_SCRIPT_DIR};

/// Outcome of running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Command the script has been invoked with.
    pub command: String,
    pub exit_status: i64,
    pub output: String,
    pub error: String,
}

impl ScriptOutcome {
    /// Outcome of a script at the given remote path which could not be run.
    pub fn not_completed(remote_path: &str, error: &SessionError) -> Self {
        warn!("unable to run {remote_path}: {error}");
        Self {
            command: invocation(remote_path),
            exit_status: CommandResult::NOT_COMPLETED,
            output: String::new(),
            error: error.to_string(),
        }
    }

    pub fn into_command_result(self) -> CommandResult {
        CommandResult::new(self.command, self.exit_status, self.output, self.error)
    }
}

/// Path of the script of the given test case on the remote host.
///
/// Only ASCII alphanumerics, `-`, and `_` of the id are kept.
pub fn remote_script_path(test_case_id: &str) -> String {
    let mut sanitized = test_case_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect::<String>();
    if sanitized.is_empty() {
        sanitized.push_str("unnamed");
    }
    format!("{REMOTE_SCRIPT_DIR}/test_{sanitized}.py")
}

/// Command invoking the script at the given remote path.
pub fn invocation(remote_path: &str) -> String {
    format!("{REMOTE_INTERPRETER} {remote_path}")
}

/// Upload a script to the given remote path, make it executable, and run it.
///
/// `uploaded` is called once the script is in place, right before it is invoked.
/// Never fails: if the script cannot be uploaded or run, the outcome has exit status
/// `-1` and the error description as error output.
pub async fn run_script<S: RemoteSession + ?Sized>(
    session: &mut S,
    remote_path: &str,
    script: &str,
    timeout: Duration,
    uploaded: impl FnOnce(),
) -> ScriptOutcome {
    let result = match upload(session, remote_path, script, timeout).await {
        Ok(()) => {
            uploaded();
            execute(session, remote_path, timeout).await
        }
        Err(error) => Err(error),
    };
    result.unwrap_or_else(|error| ScriptOutcome::not_completed(remote_path, &error))
}

async fn upload<S: RemoteSession + ?Sized>(
    session: &mut S,
    remote_path: &str,
    script: &str,
    timeout: Duration,
) -> Result<(), SessionError> {
    session.upload(remote_path, script.as_bytes()).await?;
    let chmod = session
        .exec(&format!("chmod +x {remote_path}"), timeout)
        .await?;
    if chmod.exit_status != 0 {
        return Err(SessionError::Execution(format!(
            "unable to make {remote_path} executable: {}",
            chmod.stderr.trim()
        )));
    }
    Ok(())
}

async fn execute<S: RemoteSession + ?Sized>(
    session: &mut S,
    remote_path: &str,
    timeout: Duration,
) -> Result<ScriptOutcome, SessionError> {
    let command = invocation(remote_path);
    let output = session.exec(&command, timeout).await?;
    debug!("{command:?} exited with status {}", output.exit_status);
    Ok(ScriptOutcome {
        command,
        exit_status: output.exit_status,
        output: output.stdout,
        error: output.stderr,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::session::ExecOutput;

    /// Session accepting uploads and answering every command with a fixed output.
    #[derive(Default)]
    struct ScriptedSession {
        reject_uploads: bool,
        chmod_status: i64,
        uploads: Vec<String>,
        commands: Vec<String>,
    }

    #[async_trait]
    impl RemoteSession for ScriptedSession {
        async fn exec(&mut self, command: &str, _: Duration) -> Result<ExecOutput, SessionError> {
            self.commands.push(command.to_owned());
            let exit_status = if command.starts_with("chmod") {
                self.chmod_status
            } else {
                3
            };
            Ok(ExecOutput {
                exit_status,
                stdout: "out".to_owned(),
                stderr: "err".to_owned(),
            })
        }

        async fn upload(&mut self, remote_path: &str, _: &[u8]) -> Result<(), SessionError> {
            if self.reject_uploads {
                return Err(SessionError::Execution("permission denied".to_owned()));
            }
            self.uploads.push(remote_path.to_owned());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_run_script() {
        let mut session = ScriptedSession::default();
        let mut uploaded = false;
        let outcome = run_script(&mut session, "/tmp/test_TC-1.py", "print()", TIMEOUT, || {
            uploaded = true
        })
        .await;
        assert!(uploaded);
        assert_eq!(session.uploads, ["/tmp/test_TC-1.py"]);
        assert_eq!(
            session.commands,
            ["chmod +x /tmp/test_TC-1.py", "python3 /tmp/test_TC-1.py"]
        );
        assert_eq!(outcome.exit_status, 3);
        assert_eq!((outcome.output.as_str(), outcome.error.as_str()), ("out", "err"));
    }

    #[tokio::test]
    async fn test_run_script_never_fails() {
        let mut session = ScriptedSession {
            reject_uploads: true,
            ..ScriptedSession::default()
        };
        let mut uploaded = false;
        let outcome = run_script(&mut session, "/tmp/test_TC-1.py", "print()", TIMEOUT, || {
            uploaded = true
        })
        .await;
        assert!(!uploaded);
        assert_eq!(outcome.exit_status, CommandResult::NOT_COMPLETED);
        assert_eq!(outcome.command, "python3 /tmp/test_TC-1.py");
        assert!(outcome.error.contains("permission denied"));
        assert!(session.commands.is_empty());

        let mut session = ScriptedSession {
            chmod_status: 1,
            ..ScriptedSession::default()
        };
        let outcome =
            run_script(&mut session, "/tmp/test_TC-1.py", "print()", TIMEOUT, || {}).await;
        assert_eq!(outcome.exit_status, CommandResult::NOT_COMPLETED);
        assert!(outcome.error.contains("executable"));
        assert_eq!(session.commands.len(), 1);
    }

    #[test]
    fn test_remote_script_path() {
        assert_eq!(remote_script_path("TC-1"), "/tmp/test_TC-1.py");
        assert_eq!(
            remote_script_path("req0_tc1; rm -rf /"),
            "/tmp/test_req0_tc1rm-rf.py"
        );
        assert_eq!(remote_script_path("../../etc"), "/tmp/test_etc.py");
        assert_eq!(remote_script_path("ü"), "/tmp/test_unnamed.py");
        assert_eq!(invocation("/tmp/test_x.py"), "python3 /tmp/test_x.py");
    }
}
