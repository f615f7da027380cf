//! Caller-owned state of a verification run.

use serde::{Deserialize, Serialize};

use super::{Requirement, TestCase, TestResult, TestStatus};

/// Requirements, test cases, and results of a verification run.
///
/// Results are keyed by test case id: recording a result for a test case that
/// already has one replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchContext {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

impl BatchContext {
    pub fn new(requirements: Vec<Requirement>, test_cases: Vec<TestCase>) -> Self {
        Self {
            requirements,
            test_cases,
            results: Vec::new(),
        }
    }

    /// Record a result, replacing any previous result of the same test case.
    pub fn record(&mut self, result: TestResult) {
        match self
            .results
            .iter_mut()
            .find(|existing| existing.test_case_id == result.test_case_id)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn record_all(&mut self, results: impl IntoIterator<Item = TestResult>) {
        for result in results {
            self.record(result);
        }
    }

    pub fn result_for(&self, test_case_id: &str) -> Option<&TestResult> {
        self.results
            .iter()
            .find(|result| result.test_case_id == test_case_id)
    }

    pub fn test_case(&self, test_case_id: &str) -> Option<&TestCase> {
        self.test_cases
            .iter()
            .find(|test_case| test_case.id() == Some(test_case_id))
    }

    pub fn test_cases_for_requirement<'ctx>(
        &'ctx self,
        requirement_id: &'ctx str,
    ) -> impl 'ctx + Iterator<Item = &'ctx TestCase> {
        self.test_cases
            .iter()
            .filter(move |test_case| test_case.requirement_id == requirement_id)
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_results(&self.results)
    }

    /// Statistics per requirement in order of first appearance.
    pub fn requirement_statistics(&self) -> Vec<RequirementStatistics> {
        let mut groups: Vec<RequirementStatistics> = Vec::new();
        for result in &self.results {
            let requirement_id = if result.requirement_id.is_empty() {
                super::UNKNOWN
            } else {
                result.requirement_id.as_str()
            };
            let idx = match groups
                .iter()
                .position(|group| group.requirement_id == requirement_id)
            {
                Some(idx) => idx,
                None => {
                    groups.push(RequirementStatistics {
                        requirement_id: requirement_id.to_owned(),
                        statistics: Statistics::default(),
                    });
                    groups.len() - 1
                }
            };
            groups[idx].statistics.count(result.overall_status);
        }
        groups
    }
}

/// Counts of verdicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_run: usize,
}

impl Statistics {
    pub fn from_results<'r>(results: impl IntoIterator<Item = &'r TestResult>) -> Self {
        let mut statistics = Self::default();
        for result in results {
            statistics.count(result.overall_status);
        }
        statistics
    }

    fn count(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::NotRun => self.not_run += 1,
        }
    }

    /// Percentage of passed test cases, `0.0` without any results.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Statistics of the results of one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementStatistics {
    pub requirement_id: String,
    #[serde(flatten)]
    pub statistics: Statistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, requirement: &str, status: TestStatus) -> TestResult {
        let test_case = TestCase {
            test_case_id: Some(id.to_owned()),
            requirement_id: requirement.to_owned(),
            ..TestCase::default()
        };
        TestResult::for_test_case(&test_case, status, "")
    }

    #[test]
    fn test_record_replaces_by_id() {
        let mut ctx = BatchContext::default();
        ctx.record(result("TC-1", "REQ-1", TestStatus::Fail));
        ctx.record(result("TC-2", "REQ-1", TestStatus::Pass));
        ctx.record(result("TC-1", "REQ-1", TestStatus::Pass));
        assert_eq!(ctx.results.len(), 2);
        assert_eq!(ctx.results[0].test_case_id, "TC-1");
        assert_eq!(ctx.result_for("TC-1").unwrap().overall_status, TestStatus::Pass);
    }

    #[test]
    fn test_statistics() {
        let mut ctx = BatchContext::default();
        assert_eq!(ctx.statistics().pass_rate(), 0.0);
        ctx.record_all([
            result("TC-1", "REQ-1", TestStatus::Pass),
            result("TC-2", "REQ-2", TestStatus::Fail),
            result("TC-3", "REQ-1", TestStatus::NotRun),
            result("TC-4", "", TestStatus::Pass),
        ]);
        let statistics = ctx.statistics();
        assert_eq!(statistics.total, 4);
        assert_eq!(statistics.passed, 2);
        assert_eq!(statistics.failed, 1);
        assert_eq!(statistics.not_run, 1);
        assert_eq!(statistics.pass_rate(), 50.0);
        let groups = ctx.requirement_statistics();
        let ids = groups
            .iter()
            .map(|group| group.requirement_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["REQ-1", "REQ-2", "Unknown"]);
        assert_eq!(groups[0].statistics.total, 2);
        assert_eq!(groups[0].statistics.passed, 1);
    }
}
