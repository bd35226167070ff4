//! Test results and run reports
//!
//! Structures for representing, aggregating and formatting the outcome of a
//! test run.

use crate::metric::MetricSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Test categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    RagCore,
    AgentBehavior,
    TeamOrchestration,
    QualitySafety,
    Performance,
}

impl TestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::RagCore => "rag_core",
            TestCategory::AgentBehavior => "agent_behavior",
            TestCategory::TeamOrchestration => "team_orchestration",
            TestCategory::QualitySafety => "quality_safety",
            TestCategory::Performance => "performance",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rag_core" => Ok(TestCategory::RagCore),
            "agent_behavior" => Ok(TestCategory::AgentBehavior),
            "team_orchestration" => Ok(TestCategory::TeamOrchestration),
            "quality_safety" => Ok(TestCategory::QualitySafety),
            "performance" => Ok(TestCategory::Performance),
            other => Err(format!("Unknown test category: {}", other)),
        }
    }
}

/// Severity tiers, ordered from most to least important
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSeverity {
    /// Must pass for release
    Critical,
    /// Should pass for release
    High,
    /// Can be addressed post-release
    Medium,
    /// Nice to have
    Low,
}

impl TestSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestSeverity::Critical => "critical",
            TestSeverity::High => "high",
            TestSeverity::Medium => "medium",
            TestSeverity::Low => "low",
        }
    }
}

impl fmt::Display for TestSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(TestSeverity::Critical),
            "high" => Ok(TestSeverity::High),
            "medium" => Ok(TestSeverity::Medium),
            "low" => Ok(TestSeverity::Low),
            other => Err(format!("Unknown test severity: {}", other)),
        }
    }
}

/// Outcome of one executed test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub category: TestCategory,
    pub severity: TestSeverity,
    /// True only when every metric in `metrics` passed
    pub passed: bool,
    pub score: Option<f64>,
    /// Informational test-level threshold for `score`
    pub threshold: Option<f64>,
    #[serde(default)]
    pub metrics: MetricSet,
    /// Wall-clock seconds, including the agent call
    pub execution_time: f64,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Raw inputs and outputs kept for debugging
    #[serde(default)]
    pub artifacts: Map<String, Value>,
}

impl TestResult {
    /// Build a result from computed metrics.
    ///
    /// An empty metric set never passes.
    pub fn from_metrics(
        test_name: impl Into<String>,
        category: TestCategory,
        severity: TestSeverity,
        metrics: MetricSet,
        score: f64,
        threshold: f64,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            category,
            severity,
            passed: metrics.all_passed().unwrap_or(false),
            score: Some(score),
            threshold: Some(threshold),
            metrics,
            execution_time: 0.0,
            error_message: None,
            artifacts: Map::new(),
        }
    }

    /// A result for a test that failed before producing valid metrics.
    pub fn error(
        test_name: impl Into<String>,
        category: TestCategory,
        severity: TestSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            category,
            severity,
            passed: false,
            score: None,
            threshold: None,
            metrics: MetricSet::new(),
            execution_time: 0.0,
            error_message: Some(message.into()),
            artifacts: Map::new(),
        }
    }

    pub fn with_execution_time(mut self, seconds: f64) -> Self {
        self.execution_time = seconds;
        self
    }

    pub fn with_artifact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.artifacts.insert(key.into(), value.into());
        self
    }
}

/// Pass/fail counts for one group of results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl Tally {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.failed as f64 / self.total as f64 }
    }
}

/// Timing statistics across executed tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub avg_execution_time: f64,
    pub total_execution_time: f64,
}

/// Breakdowns computed after a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub by_category: BTreeMap<TestCategory, Tally>,
    pub by_severity: BTreeMap<TestSeverity, Tally>,
    pub performance: PerformanceStats,
}

impl AggregateMetrics {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut metrics = Self::default();
        for result in results {
            metrics.by_category.entry(result.category).or_default().record(result.passed);
            metrics.by_severity.entry(result.severity).or_default().record(result.passed);
        }

        if !results.is_empty() {
            let total: f64 = results.iter().map(|r| r.execution_time).sum();
            metrics.performance = PerformanceStats {
                avg_execution_time: total / results.len() as f64,
                total_execution_time: total,
            };
        }
        metrics
    }

    /// Failed-test count for a severity tier (0 when none ran).
    pub fn failures(&self, severity: TestSeverity) -> usize {
        self.by_severity.get(&severity).map_or(0, |t| t.failed)
    }
}

/// Headline counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Executed tests; always equals `passed + failed`
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// Selected tests left unexecuted because a run stopped early
    #[serde(default)]
    pub skipped: usize,
    /// Wall-clock seconds for the whole run
    pub execution_time: f64,
}

impl RunSummary {
    pub fn pass_rate(&self) -> f64 {
        self.passed as f64 / self.total_tests.max(1) as f64
    }
}

/// Aggregate document persisted after every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: String,
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub summary: RunSummary,
    pub test_results: Vec<TestResult>,
    pub metrics: AggregateMetrics,
    /// Runner-level failures (crashes, timeouts, setup errors)
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new(
        run_id: &str,
        started_at: chrono::DateTime<chrono::Utc>,
        test_results: Vec<TestResult>,
        errors: Vec<String>,
        skipped: usize,
        execution_time: f64,
    ) -> Self {
        let passed = test_results.iter().filter(|r| r.passed).count();
        let summary = RunSummary {
            total_tests: test_results.len(),
            passed,
            failed: test_results.len() - passed,
            skipped,
            execution_time,
        };
        let metrics = AggregateMetrics::from_results(&test_results);

        Self { run_id: run_id.to_string(), started_at, summary, test_results, metrics, errors }
    }

    /// Check if all tests passed
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    /// Get failed results only
    pub fn failures(&self) -> Vec<&TestResult> {
        self.test_results.iter().filter(|r| !r.passed).collect()
    }

    /// Format as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Test Run: {}\n", self.run_id));
        output.push_str(&format!("Execution Time: {:.2}s\n", self.summary.execution_time));
        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Total: {}\n", self.summary.total_tests));
        output.push_str(&format!("  Passed: {}\n", self.summary.passed));
        output.push_str(&format!("  Failed: {}\n", self.summary.failed));
        if self.summary.skipped > 0 {
            output.push_str(&format!("  Skipped: {}\n", self.summary.skipped));
        }
        output.push_str(&format!("  Pass Rate: {:.1}%\n", self.summary.pass_rate() * 100.0));

        if !self.metrics.by_category.is_empty() {
            output.push_str("\nBy Category:\n");
            for (category, tally) in &self.metrics.by_category {
                output.push_str(&format!("  {}: {}/{} passed\n", category, tally.passed, tally.total));
            }
        }

        if self.summary.failed > 0 {
            output.push_str("\nFailed Tests:\n");
            for result in self.failures() {
                match &result.error_message {
                    Some(message) => {
                        output.push_str(&format!("  - {} ({})\n", result.test_name, message))
                    }
                    None => {
                        let failing: Vec<&str> = result
                            .metrics
                            .iter()
                            .filter(|(_, m)| !m.passed())
                            .map(|(key, _)| key.as_str())
                            .collect();
                        output.push_str(&format!(
                            "  - {} ({})\n",
                            result.test_name,
                            failing.join(", ")
                        ));
                    }
                }
            }
        }

        output
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
