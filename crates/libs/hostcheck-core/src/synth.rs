//! Synthesis of standalone verification scripts.
//!
//! A synthesized script is a Python 3 program which runs the commands of a test case
//! through the shell, one after another, prints what they did, and decides whether
//! the test passed after the last command:
//!
//! - With pass criteria, the test passes iff the criteria is a case-sensitive
//!   substring of the combined stdout of all commands.
//! - Without pass criteria, the test passes iff the last command exited with `0`.
//!
//! The script exits with `0` if the test passed and with `1` otherwise. Errors raised
//! by the script itself are caught and reported as failure.
//!
//! By default, commands and pass criteria are interpolated into the script as they
//! are, i.e., they are trusted. A command containing a double quote or a backslash
//! will thus break the script or change its meaning. Enable
//! [`SynthesisOptions::quote_literals`] to embed them as escaped string literals.

use crate::extract;
use crate::model::TestCase;

/// Options for script synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Embed texts as escaped string literals instead of interpolating them.
    pub quote_literals: bool,
}

/// Script of the given test case: its custom script or one synthesized from the
/// extracted commands.
pub fn script_for(test_case: &TestCase, options: SynthesisOptions) -> String {
    match test_case.custom_script() {
        Some(script) => script.to_owned(),
        None => synthesize_with(test_case, &extract::extract(test_case), options),
    }
}

/// Synthesize a script for the given test case and commands.
pub fn synthesize(test_case: &TestCase, commands: &[String]) -> String {
    synthesize_with(test_case, commands, SynthesisOptions::default())
}

/// Synthesize a script for the given test case and commands using the given options.
pub fn synthesize_with(
    test_case: &TestCase,
    commands: &[String],
    options: SynthesisOptions,
) -> String {
    let mut script = Script::new(options);
    let test_id = test_case.id().unwrap_or("unknown_id");
    let title = if test_case.title.is_empty() {
        "Untitled Test"
    } else {
        &test_case.title
    };

    script.line(0, "#!/usr/bin/env python3");
    script.comment("Automated test case", test_id);
    script.comment("Title", title);
    script.comment("Description", &test_case.description);
    script.comment("Preconditions", &test_case.preconditions);
    script.comment("Priority", &test_case.priority.to_string());
    script.comment("Type", test_case.test_type());
    script.blank();
    for module in ["os", "sys", "subprocess", "time", "socket"] {
        script.line(0, &format!("import {module}"));
    }
    script.blank();
    script.blank();
    script.block(
        0,
        r#"
def execute(step, command):
    print("Step " + str(step) + ": executing command: " + command)
    process = subprocess.run(command, shell=True, capture_output=True, text=True)
    print("Command exit code: " + str(process.returncode))
    if process.stdout:
        print("Output:")
        print("-" * 40)
        print(process.stdout)
        print("-" * 40)
    if process.stderr:
        print("Error:")
        print("-" * 40)
        print(process.stderr)
        print("-" * 40)
    return process.stdout, process.stderr, process.returncode
"#,
    );
    script.blank();
    script.blank();
    script.line(0, "def run_test():");
    let banner = format!(
        "print(\"Starting test: \" + {} + \" - \" + {})",
        script.literal(test_id),
        script.literal(title)
    );
    script.line(1, &banner);
    script.block(
        1,
        r#"
print("Running on host: " + socket.gethostname())
print("Time: " + time.strftime("%Y-%m-%d %H:%M:%S"))
print("-" * 60)

result = {"success": False, "output": "", "error": ""}
all_outputs = []
exit_code = None
"#,
    );
    script.blank();
    script.line(1, "try:");
    for (idx, command) in commands.iter().enumerate() {
        let step = format!(
            "output, error, exit_code = execute({}, {})",
            idx + 1,
            script.literal(command)
        );
        script.line(2, &step);
        script.line(2, "if output:");
        script.line(3, "all_outputs.append(output)");
        script.blank();
    }
    script.line(2, r#"combined_output = "\n".join(all_outputs)"#);
    match test_case.pass_criteria() {
        Some(criteria) => {
            let criteria = format!("criteria = {}", script.literal(criteria));
            script.line(2, &criteria);
            script.block(
                2,
                r#"
if criteria in combined_output:
    result["success"] = True
    print("Pass criteria matched")
else:
    result["error"] = "Pass criteria not met"
    print("Pass criteria not met")
"#,
            );
        }
        None => {
            script.block(
                2,
                r#"
if exit_code == 0:
    result["success"] = True
    print("Command executed successfully")
else:
    result["error"] = "Command failed with exit code " + str(exit_code)
    print("Command failed with exit code " + str(exit_code))
"#,
            );
        }
    }
    script.line(2, r#"result["output"] = combined_output"#);
    script.block(
        1,
        r#"
except Exception as e:
    result["error"] = str(e)
    print("Error executing test: " + str(e))

print("-" * 60)
return result
"#,
    );
    script.blank();
    script.blank();
    script.block(
        0,
        r#"
if __name__ == "__main__":
    result = run_test()
    if result["success"]:
        print("TEST PASSED")
        sys.exit(0)
    else:
        print("TEST FAILED: " + result.get("error", "Unknown error"))
        sys.exit(1)
"#,
    );
    script.source
}

/// Script source under construction.
struct Script {
    source: String,
    options: SynthesisOptions,
}

impl Script {
    fn new(options: SynthesisOptions) -> Self {
        Self {
            source: String::new(),
            options,
        }
    }

    fn line(&mut self, indent: usize, line: &str) {
        for _ in 0..indent {
            self.source.push_str("    ");
        }
        self.source.push_str(line);
        self.source.push('\n');
    }

    fn blank(&mut self) {
        self.source.push('\n');
    }

    /// Append the non-empty lines of a block, preserving their relative indentation.
    fn block(&mut self, indent: usize, block: &str) {
        for line in block.trim_matches('\n').lines() {
            if line.trim().is_empty() {
                self.blank();
            } else {
                self.line(indent, line);
            }
        }
    }

    fn comment(&mut self, label: &str, text: &str) {
        let text = if self.options.quote_literals {
            text.replace(['\r', '\n'], " ")
        } else {
            text.to_owned()
        };
        self.line(0, &format!("# {label}: {text}"));
    }

    /// Embed a text as string expression.
    fn literal(&self, text: &str) -> String {
        if self.options.quote_literals {
            python_literal(text)
        } else {
            format!("\"{text}\"")
        }
    }
}

/// Escape a text as Python string literal.
pub fn python_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\U{:08x}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
