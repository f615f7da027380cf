//! Reading and writing of test case and result files.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use anyhow::Context;

use hostcheck_core::model::assign_test_case_ids;
use hostcheck_core::{BatchContext, TestCase, TestResult};

/// Load test cases and requirements.
///
/// JSON files contain either an array of test cases or a document with
/// `test_cases` and `requirements` arrays. TOML files contain such a document.
/// Test cases without id are assigned one.
pub fn load_cases(path: &Path) -> anyhow::Result<BatchContext> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read test cases from {path:?}"))?;
    let mut context = if path.extension() == Some(OsStr::new("toml")) {
        toml::from_str::<BatchContext>(&text)
            .with_context(|| format!("invalid test case document {path:?}"))?
    } else {
        let value = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("invalid JSON in {path:?}"))?;
        if value.is_array() {
            let test_cases = serde_json::from_value::<Vec<TestCase>>(value)
                .with_context(|| format!("invalid test cases in {path:?}"))?;
            BatchContext::new(Vec::new(), test_cases)
        } else {
            serde_json::from_value::<BatchContext>(value)
                .with_context(|| format!("invalid test case document {path:?}"))?
        }
    };
    assign_test_case_ids(&mut context.test_cases);
    Ok(context)
}

/// Load results from a results file.
pub fn load_results(path: &Path) -> anyhow::Result<Vec<TestResult>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("unable to read results {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("invalid results file {path:?}"))
}

/// Record a result in a results file, replacing any previous result of the same
/// test case. The file is created if it does not exist.
pub fn merge_result(path: &Path, result: TestResult) -> anyhow::Result<()> {
    let mut context = BatchContext::default();
    if path.exists() {
        context.results = load_results(path)?;
    }
    context.record(result);
    write_results(path, &context.results)
}

/// Write results to a results file.
pub fn write_results(path: &Path, results: &[TestResult]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json).with_context(|| format!("unable to write results to {path:?}"))
}

#[cfg(test)]
mod tests {
    use hostcheck_core::TestStatus;
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_load_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        fs::write(
            &path,
            indoc! {r#"
                [
                    {"requirement_id": "REQ-1", "title": "Firewall", "pass_criteria": null},
                    {"test_case_id": "TC-9", "requirement_id": "REQ-1"}
                ]
            "#},
        )
        .unwrap();
        let context = load_cases(&path).unwrap();
        assert!(context.requirements.is_empty());
        assert_eq!(context.test_cases[0].id(), Some("req0_tc0"));
        assert_eq!(context.test_cases[1].id(), Some("TC-9"));
    }

    #[test]
    fn test_load_toml_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.toml");
        fs::write(
            &path,
            indoc! {r#"
                [[requirements]]
                requirement_id = "REQ-1"
                description = "The firewall must be active."

                [[test_cases]]
                test_case_id = "TC-1"
                requirement_id = "REQ-1"
                verification_commands = "sudo ufw status"
                pass_criteria = "Status: active"
            "#},
        )
        .unwrap();
        let context = load_cases(&path).unwrap();
        assert_eq!(context.requirements[0].requirement_id, "REQ-1");
        assert_eq!(
            context.test_cases[0].verification_commands,
            ["sudo ufw status"]
        );
    }

    #[test]
    fn test_merge_replaces_previous_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let test_case = TestCase {
            test_case_id: Some("TC-1".to_owned()),
            ..TestCase::default()
        };
        merge_result(
            &path,
            TestResult::for_test_case(&test_case, TestStatus::Fail, "boom"),
        )
        .unwrap();
        merge_result(
            &path,
            TestResult::for_test_case(&test_case, TestStatus::Pass, ""),
        )
        .unwrap();
        let results = load_results(&path).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].overall_status, TestStatus::Pass);
    }
}
