//! Derivation of the shell commands verifying a test case.
//!
//! Commands are resolved from the first source providing any, in this order:
//!
//! 1. the `verification_commands` field,
//! 2. the `commands_to_run` field,
//! 3. the first matching entry of [`RULES`], based on keywords in the lower-cased
//!    title and, for some keywords, description, or [`FALLBACK_COMMANDS`] if no rule
//!    matches.
//!
//! The result is never empty.

use std::fmt;

use crate::model::TestCase;

/// Source the commands of a test case have been taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    VerificationCommands,
    CommandsToRun,
    /// Heuristic rule with the given name.
    Rule(&'static str),
    Fallback,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::VerificationCommands => f.write_str("verification_commands"),
            CommandSource::CommandsToRun => f.write_str("commands_to_run"),
            CommandSource::Rule(name) => write!(f, "rule `{name}`"),
            CommandSource::Fallback => f.write_str("fallback"),
        }
    }
}

/// Heuristic rule mapping keywords to default commands.
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    /// Keywords applying the rule when they occur in the title or the description.
    pub keywords: &'static [&'static str],
    /// Keywords applying the rule only when they occur in the title.
    pub title_keywords: &'static [&'static str],
    pub commands: RuleCommands,
}

/// Commands of a heuristic rule.
#[derive(Debug)]
pub enum RuleCommands {
    Fixed(&'static [&'static str]),
    /// Inspect the first mentioned path, or run the fallback commands.
    InspectPath {
        paths: &'static [&'static str],
        fallback: &'static [&'static str],
    },
}

/// Heuristic rules in order of precedence.
pub static RULES: &[Rule] = &[
    Rule {
        name: "permission",
        keywords: &["permission"],
        title_keywords: &[],
        commands: RuleCommands::InspectPath {
            paths: &["/etc/passwd", "/etc/shadow", "/etc/ssh/sshd_config"],
            fallback: &["ls -la /etc"],
        },
    },
    Rule {
        name: "firewall",
        keywords: &["firewall"],
        title_keywords: &["ufw"],
        commands: RuleCommands::Fixed(&["sudo ufw status"]),
    },
    Rule {
        name: "system-status",
        keywords: &[],
        title_keywords: &["system", "status"],
        commands: RuleCommands::Fixed(&["uname -a", "uptime"]),
    },
];

/// Commands used when no rule matches.
pub static FALLBACK_COMMANDS: &[&str] = &["uname -a", "ls -la /etc"];

/// Extract the commands verifying the given test case.
pub fn extract(test_case: &TestCase) -> Vec<String> {
    resolve(test_case).1
}

/// Extract the commands verifying the given test case together with their source.
pub fn resolve(test_case: &TestCase) -> (CommandSource, Vec<String>) {
    if let Some(commands) = explicit(&test_case.verification_commands) {
        return (CommandSource::VerificationCommands, commands);
    }
    if let Some(commands) = explicit(&test_case.commands_to_run) {
        return (CommandSource::CommandsToRun, commands);
    }
    let title = test_case.title.to_lowercase();
    let haystack = format!("{title}\n{}", test_case.description.to_lowercase());
    for rule in RULES {
        if rule.matches(&title, &haystack) {
            return (CommandSource::Rule(rule.name), rule.commands(&haystack));
        }
    }
    (CommandSource::Fallback, to_owned(FALLBACK_COMMANDS))
}

impl Rule {
    fn matches(&self, title: &str, haystack: &str) -> bool {
        self.keywords.iter().any(|keyword| haystack.contains(keyword))
            || self.title_keywords.iter().any(|keyword| title.contains(keyword))
    }

    fn commands(&self, haystack: &str) -> Vec<String> {
        match &self.commands {
            RuleCommands::Fixed(commands) => to_owned(commands),
            RuleCommands::InspectPath { paths, fallback } => {
                match paths.iter().find(|path| haystack.contains(*path)) {
                    Some(path) => vec![format!("ls -l {path}")],
                    None => to_owned(fallback),
                }
            }
        }
    }
}

fn explicit(commands: &[String]) -> Option<Vec<String>> {
    let commands = commands
        .iter()
        .filter(|command| !command.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>();
    (!commands.is_empty()).then_some(commands)
}

fn to_owned(commands: &[&str]) -> Vec<String> {
    commands.iter().map(|command| (*command).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(title: &str, description: &str) -> TestCase {
        TestCase {
            title: title.to_owned(),
            description: description.to_owned(),
            ..TestCase::default()
        }
    }

    #[test]
    fn test_explicit_commands_take_precedence() {
        let mut test_case = case("Firewall is active", "");
        test_case.commands_to_run = vec!["ufw status verbose".to_owned()];
        assert_eq!(
            resolve(&test_case),
            (CommandSource::CommandsToRun, vec!["ufw status verbose".to_owned()])
        );
        test_case.verification_commands = vec!["iptables -L".to_owned(), "ss -tlnp".to_owned()];
        assert_eq!(extract(&test_case), ["iptables -L", "ss -tlnp"]);
    }

    #[test]
    fn test_blank_commands_fall_through() {
        let mut test_case = case("Kernel version", "");
        test_case.verification_commands = vec!["  ".to_owned()];
        assert_eq!(resolve(&test_case).0, CommandSource::Fallback);
    }

    #[test]
    fn test_permission_rule() {
        assert_eq!(
            extract(&case("Permissions of /etc/shadow", "")),
            ["ls -l /etc/shadow"]
        );
        assert_eq!(
            extract(&case("File PERMISSION check", "Verify /etc/ssh/sshd_config")),
            ["ls -l /etc/ssh/sshd_config"]
        );
        // `/etc/passwd` wins over the other paths.
        assert_eq!(
            extract(&case("permission", "/etc/shadow and /etc/passwd")),
            ["ls -l /etc/passwd"]
        );
        assert_eq!(extract(&case("Permission hardening", "")), ["ls -la /etc"]);
    }

    #[test]
    fn test_rule_precedence() {
        assert_eq!(
            resolve(&case("System firewall permissions", "")).0,
            CommandSource::Rule("permission")
        );
        assert_eq!(
            extract(&case("UFW enabled", "system must be protected")),
            ["sudo ufw status"]
        );
        assert_eq!(extract(&case("Service status", "")), ["uname -a", "uptime"]);
        assert_eq!(extract(&case("Password policy", "")), ["uname -a", "ls -la /etc"]);
    }

    #[test]
    fn test_title_only_keywords() {
        assert_eq!(
            resolve(&case("Password policy", "verify system logs are rotated")),
            (
                CommandSource::Fallback,
                vec!["uname -a".to_owned(), "ls -la /etc".to_owned()]
            )
        );
        assert_eq!(
            resolve(&case("Open ports", "check the output of ufw status")).0,
            CommandSource::Fallback
        );
        assert_eq!(
            extract(&case("Ingress", "the FIREWALL drops unknown traffic")),
            ["sudo ufw status"]
        );
        assert_eq!(
            extract(&case("Audit", "permission bits of /etc/shadow")),
            ["ls -l /etc/shadow"]
        );
    }

    #[test]
    fn test_extraction_is_idempotent_and_never_empty() {
        let cases = [
            case("", ""),
            case("Permission", ""),
            case("firewall", ""),
            case("status", ""),
            case("anything else", "with a description"),
        ];
        for test_case in &cases {
            let commands = extract(test_case);
            assert!(!commands.is_empty());
            assert_eq!(commands, extract(test_case));
        }
    }
}
