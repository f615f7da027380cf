//! Records exchanged with the ingestion, generation, and reporting layers.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::settings::DEFAULT_PORT;

mod context;

pub use context::{BatchContext, RequirementStatistics, Statistics};

/// Placeholder for missing requirement and test case ids.
pub const UNKNOWN: &str = "Unknown";

/// System requirement a test case is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(alias = "id")]
    pub requirement_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub requirement_type: Option<String>,
}

/// Priority of a test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        })
    }
}

/// Concrete, executable check derived from a requirement.
///
/// Records are produced by an external generator and may be sparse, hence almost
/// every field tolerates absence or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub requirement_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub preconditions: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub verification_commands: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub commands_to_run: Vec<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub expected_results: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub pass_criteria: String,
    #[serde(default, deserialize_with = "nullable_priority")]
    pub priority: Priority,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    /// Script body replacing the synthesized one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_code: Option<String>,
}

impl TestCase {
    /// The test case id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.test_case_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The requirement id or [`UNKNOWN`] for dangling test cases.
    pub fn requirement(&self) -> &str {
        if self.requirement_id.is_empty() {
            UNKNOWN
        } else {
            &self.requirement_id
        }
    }

    /// The pass criteria, if any.
    pub fn pass_criteria(&self) -> Option<&str> {
        Some(self.pass_criteria.as_str()).filter(|criteria| !criteria.is_empty())
    }

    /// The type of the test, defaulting to `Functional`.
    pub fn test_type(&self) -> &str {
        self.test_type.as_deref().unwrap_or("Functional")
    }

    /// Custom script body, if any.
    pub fn custom_script(&self) -> Option<&str> {
        self.python_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
    }
}

/// Assign deterministic ids to test cases lacking one.
///
/// Test cases are grouped by requirement in order of first appearance. A test case
/// without id gets `req{R}_tc{T}` where `R` is the index of its group and `T` its
/// position within that group, so processing the same test cases again yields the
/// same ids.
pub fn assign_test_case_ids(test_cases: &mut [TestCase]) {
    let mut groups: HashMap<String, (usize, usize)> = HashMap::new();
    for test_case in test_cases.iter_mut() {
        let next_group = groups.len();
        let (group, position) = groups
            .entry(test_case.requirement().to_owned())
            .or_insert((next_group, 0));
        if test_case.id().is_none() {
            test_case.test_case_id = Some(format!("req{group}_tc{position}"));
        }
        *position += 1;
    }
}

/// Result of a single remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    pub exit_status: i64,
    #[serde(default, deserialize_with = "nullable_string")]
    pub output: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandResult {
    /// Exit status recorded when a command could not be run to completion.
    pub const NOT_COMPLETED: i64 = -1;

    pub fn new(
        command: impl Into<String>,
        exit_status: i64,
        output: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            exit_status,
            output: output.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Result of a command that could not be run to completion.
    pub fn not_completed(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(command, Self::NOT_COMPLETED, "", error)
    }

    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }
}

/// Verdict of a test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    Pass,
    Fail,
    #[default]
    #[serde(rename = "Not Run")]
    NotRun,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "Pass",
            TestStatus::Fail => "Fail",
            TestStatus::NotRun => "Not Run",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one execution attempt of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub requirement_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default)]
    pub commands_executed: Vec<CommandResult>,
    #[serde(default)]
    pub overall_status: TestStatus,
    #[serde(default, deserialize_with = "nullable_string")]
    pub notes: String,
    pub execution_timestamp: DateTime<Utc>,
    /// Script body that was executed, if the test case ran as a script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl TestResult {
    /// Create a result for the given test case.
    ///
    /// The test case is expected to carry an id already, see [`assign_test_case_ids`].
    pub fn for_test_case(test_case: &TestCase, status: TestStatus, notes: impl Into<String>) -> Self {
        Self {
            test_case_id: test_case.id().unwrap_or(UNKNOWN).to_owned(),
            requirement_id: test_case.requirement_id.clone(),
            title: test_case.title.clone(),
            commands_executed: Vec::new(),
            overall_status: status,
            notes: notes.into(),
            execution_timestamp: Utc::now(),
            script: None,
        }
    }

    /// Stdout of all executed commands.
    pub fn combined_output(&self) -> String {
        self.commands_executed
            .iter()
            .map(|result| result.output.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Authentication method for the remote host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Password,
    Key,
}

/// Connection details of a remote host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default)]
    pub hostname: String,
    #[serde(default = "default_port", deserialize_with = "port_from_str_or_int")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Private key material in OpenSSH or PEM format.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

impl RemoteConfig {
    /// Configuration for password authentication.
    pub fn with_password(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            auth_type: AuthType::Password,
            password: Some(password.into()),
            private_key: None,
        }
    }

    /// Configuration for public key authentication.
    pub fn with_private_key(
        hostname: impl Into<String>,
        username: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            auth_type: AuthType::Key,
            password: None,
            private_key: Some(private_key.into()),
        }
    }

    /// Check that the configuration is complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingHostname);
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        match self.auth_type {
            AuthType::Password if self.password.as_deref().unwrap_or("").is_empty() => {
                Err(ConfigError::MissingPassword)
            }
            AuthType::Key if self.private_key.as_deref().unwrap_or("").trim().is_empty() => {
                Err(ConfigError::MissingPrivateKey)
            }
            _ => Ok(()),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            auth_type: AuthType::default(),
            password: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth_type", &self.auth_type)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parse a port given as text, an empty text meaning the default port.
pub fn parse_port(port: &str) -> Result<u16, ConfigError> {
    let port = port.trim();
    if port.is_empty() {
        return Ok(DEFAULT_PORT);
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPort(port.to_owned())),
        Ok(port) => Ok(port),
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn port_from_str_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Int(u64),
        Text(String),
    }
    match RawPort::deserialize(deserializer)? {
        RawPort::Int(port) => u16::try_from(port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| serde::de::Error::custom(ConfigError::InvalidPort(port.to_string()))),
        RawPort::Text(port) => parse_port(&port).map_err(serde::de::Error::custom),
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
    Ok(Option::<Priority>::deserialize(deserializer)?.unwrap_or_default())
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) if item.is_empty() => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn case(id: Option<&str>, requirement: &str) -> TestCase {
        TestCase {
            test_case_id: id.map(str::to_owned),
            requirement_id: requirement.to_owned(),
            ..TestCase::default()
        }
    }

    #[test]
    fn test_sparse_test_case() {
        let test_case: TestCase = serde_json::from_value(json!({
            "requirement_id": "REQ-1",
            "title": "Check firewall",
            "verification_commands": "sudo ufw status",
            "pass_criteria": null,
            "priority": "high",
        }))
        .unwrap();
        assert_eq!(test_case.id(), None);
        assert_eq!(test_case.verification_commands, vec!["sudo ufw status"]);
        assert_eq!(test_case.pass_criteria(), None);
        assert_eq!(test_case.priority, Priority::High);
        assert_eq!(test_case.test_type(), "Functional");
    }

    #[test]
    fn test_assigned_ids_are_stable() {
        let mut cases = vec![
            case(None, "REQ-1"),
            case(None, "REQ-2"),
            case(Some("TC-X"), "REQ-1"),
            case(None, "REQ-1"),
            case(None, ""),
        ];
        let mut again = cases.clone();
        assign_test_case_ids(&mut cases);
        assign_test_case_ids(&mut again);
        let ids = cases.iter().map(|c| c.id().unwrap()).collect::<Vec<_>>();
        assert_eq!(ids, ["req0_tc0", "req1_tc0", "TC-X", "req0_tc2", "req2_tc0"]);
        assert_eq!(cases, again);
        // Assigning again must not change anything.
        assign_test_case_ids(&mut again);
        assert_eq!(cases, again);
    }

    #[test]
    fn test_port_coercion() {
        let config: RemoteConfig =
            serde_json::from_value(json!({"hostname": "h", "username": "u", "port": "2222"}))
                .unwrap();
        assert_eq!(config.port, 2222);
        let config: RemoteConfig =
            serde_json::from_value(json!({"hostname": "h", "username": "u", "port": ""})).unwrap();
        assert_eq!(config.port, 22);
        let config: RemoteConfig =
            serde_json::from_value(json!({"hostname": "h", "username": "u"})).unwrap();
        assert_eq!(config.port, 22);
        assert!(
            serde_json::from_value::<RemoteConfig>(json!({"hostname": "h", "port": "ssh"}))
                .is_err()
        );
        assert_eq!(parse_port("70000"), Err(ConfigError::InvalidPort("70000".to_owned())));
    }

    #[test]
    fn test_validate() {
        let mut config = RemoteConfig::with_password("host", "root", "secret");
        assert_eq!(config.validate(), Ok(()));
        config.password = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingPassword));
        config.hostname.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingHostname));
        let mut config = RemoteConfig::with_private_key("host", " ", "KEY");
        assert_eq!(config.validate(), Err(ConfigError::MissingUsername));
        config.username = "root".to_owned();
        config.private_key = Some("\n".to_owned());
        assert_eq!(config.validate(), Err(ConfigError::MissingPrivateKey));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let config = RemoteConfig::with_password("host", "root", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
        assert!(!serde_json::to_string(&config).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(serde_json::to_value(TestStatus::NotRun).unwrap(), json!("Not Run"));
        assert_eq!(
            serde_json::from_value::<TestStatus>(json!("Pass")).unwrap(),
            TestStatus::Pass
        );
    }
}
