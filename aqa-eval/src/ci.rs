//! CI quality gates
//!
//! [`CiRunner`] wraps a [`TestRunner`] execution with configurable gates and
//! derives a build status, advisory recommendations and a process exit code.

use crate::case::TestCase;
use crate::error::Result;
use crate::report::{RunReport, TestCategory, TestSeverity};
use crate::runner::{TestFilter, TestRunner};
use crate::storage::write_json_atomic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const CI_REPORT_FILE: &str = "ci_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub max_avg_execution_time: f64,
    pub max_total_execution_time: f64,
    /// Whether the total-time gate affects the build status
    pub enforce_total_execution_time: bool,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_avg_execution_time: 30.0,
            max_total_execution_time: 300.0,
            enforce_total_execution_time: false,
        }
    }
}

/// Limits that only produce recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryThresholds {
    pub category_failure_rate: f64,
    pub pass_rate_warning: f64,
    pub slow_avg_execution_time: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self { category_failure_rate: 0.2, pass_rate_warning: 0.9, slow_avg_execution_time: 15.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiConfig {
    pub required_severities: Vec<TestSeverity>,
    /// `None` runs every category
    pub required_categories: Option<Vec<TestCategory>>,
    pub fail_fast: bool,
    pub min_pass_rate: f64,
    pub max_critical_failures: usize,
    pub max_high_failures: usize,
    pub performance_thresholds: PerformanceThresholds,
    pub advisories: AdvisoryThresholds,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            required_severities: vec![TestSeverity::Critical, TestSeverity::High],
            required_categories: None,
            fail_fast: false,
            min_pass_rate: 0.95,
            max_critical_failures: 0,
            max_high_failures: 2,
            performance_thresholds: PerformanceThresholds::default(),
            advisories: AdvisoryThresholds::default(),
        }
    }
}

impl CiConfig {
    pub fn filter(&self) -> TestFilter {
        TestFilter {
            severities: Some(self.required_severities.clone()),
            categories: self.required_categories.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Passed,
    Failed,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Passed => f.write_str("PASSED"),
            BuildStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// One named threshold check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    pub id: String,
    pub name: String,
    pub actual: f64,
    pub threshold: f64,
    pub passed: bool,
    /// Non-enforced gates are reported but do not affect the build status
    pub enforced: bool,
}

impl QualityGate {
    fn at_least(id: &str, name: &str, actual: f64, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            actual,
            threshold,
            passed: actual >= threshold,
            enforced: true,
        }
    }

    fn at_most(id: &str, name: &str, actual: f64, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            actual,
            threshold,
            passed: actual <= threshold,
            enforced: true,
        }
    }

    fn advisory(mut self, enforced: bool) -> Self {
        self.enforced = enforced;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiSummary {
    pub build_status: BuildStatus,
    pub run_id: String,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pass_rate: f64,
    pub execution_time: f64,
}

/// Gate-by-gate CI decision for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiReport {
    pub ci_summary: CiSummary,
    pub quality_gates: Vec<QualityGate>,
    pub recommendations: Vec<String>,
    pub exit_code: i32,
}

impl CiReport {
    pub fn evaluate(run: &RunReport, config: &CiConfig) -> Self {
        let quality_gates = quality_gates(run, config);
        let build_status = if quality_gates.iter().filter(|g| g.enforced).all(|g| g.passed) {
            BuildStatus::Passed
        } else {
            BuildStatus::Failed
        };

        Self {
            ci_summary: CiSummary {
                build_status,
                run_id: run.run_id.clone(),
                total_tests: run.summary.total_tests,
                passed: run.summary.passed,
                failed: run.summary.failed,
                skipped: run.summary.skipped,
                pass_rate: run.summary.pass_rate(),
                execution_time: run.summary.execution_time,
            },
            quality_gates,
            recommendations: recommendations(run, config),
            exit_code: exit_code(run, config),
        }
    }

    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    pub fn format_summary(&self) -> String {
        let summary = &self.ci_summary;
        let rule = "=".repeat(60);
        let mut output = String::new();

        output.push_str(&format!("\n{}\nAGENT QUALITY TEST RESULTS\n{}\n", rule, rule));
        output.push_str(&format!("Build Status: {}\n", summary.build_status));
        output.push_str(&format!("Tests Run: {}\n", summary.total_tests));
        output.push_str(&format!("Passed: {}\n", summary.passed));
        output.push_str(&format!("Failed: {}\n", summary.failed));
        if summary.skipped > 0 {
            output.push_str(&format!("Skipped: {}\n", summary.skipped));
        }
        output.push_str(&format!("Pass Rate: {:.1}%\n", summary.pass_rate * 100.0));
        output.push_str(&format!("Execution Time: {:.2}s\n", summary.execution_time));

        output.push_str(&format!("\nQUALITY GATES\n{}\n", "-".repeat(40)));
        for gate in &self.quality_gates {
            let status = if gate.passed { "PASS" } else { "FAIL" };
            let note = if gate.enforced { "" } else { " (advisory)" };
            output.push_str(&format!("{}: {}{}\n", gate.name, status, note));
            output.push_str(&format!("  Actual: {}, Threshold: {}\n", gate.actual, gate.threshold));
        }

        if !self.recommendations.is_empty() {
            output.push_str(&format!("\nRECOMMENDATIONS\n{}\n", "-".repeat(40)));
            for recommendation in &self.recommendations {
                output.push_str(&format!("  {}\n", recommendation));
            }
        }

        output.push_str(&format!("\n{}\n", rule));
        output
    }
}

/// 0 only when critical failures, pass rate and high failures are all within
/// limits. Timing gates never change the exit code.
pub fn exit_code(run: &RunReport, config: &CiConfig) -> i32 {
    let critical = run.metrics.failures(TestSeverity::Critical);
    let high = run.metrics.failures(TestSeverity::High);

    let ok = critical <= config.max_critical_failures
        && run.summary.pass_rate() >= config.min_pass_rate
        && high <= config.max_high_failures;
    if ok { 0 } else { 1 }
}

fn quality_gates(run: &RunReport, config: &CiConfig) -> Vec<QualityGate> {
    let performance = &run.metrics.performance;
    let limits = &config.performance_thresholds;

    vec![
        QualityGate::at_least(
            "pass_rate",
            "Minimum Pass Rate",
            run.summary.pass_rate(),
            config.min_pass_rate,
        ),
        QualityGate::at_most(
            "critical_failures",
            "Maximum Critical Failures",
            run.metrics.failures(TestSeverity::Critical) as f64,
            config.max_critical_failures as f64,
        ),
        QualityGate::at_most(
            "high_failures",
            "Maximum High Severity Failures",
            run.metrics.failures(TestSeverity::High) as f64,
            config.max_high_failures as f64,
        ),
        QualityGate::at_most(
            "avg_execution_time",
            "Average Execution Time",
            performance.avg_execution_time,
            limits.max_avg_execution_time,
        ),
        QualityGate::at_most(
            "total_execution_time",
            "Total Execution Time",
            performance.total_execution_time,
            limits.max_total_execution_time,
        )
        .advisory(limits.enforce_total_execution_time),
    ]
}

fn recommendations(run: &RunReport, config: &CiConfig) -> Vec<String> {
    let advisories = &config.advisories;
    let mut recommendations = Vec::new();

    let critical = run.metrics.failures(TestSeverity::Critical);
    if critical > 0 {
        recommendations.push(format!(
            "{} CRITICAL test(s) failed. Address immediately before release.",
            critical
        ));
    }

    let pass_rate = run.summary.pass_rate();
    if pass_rate < advisories.pass_rate_warning {
        recommendations.push(format!(
            "Pass rate is {:.1}%. Consider reviewing failed tests and improving quality.",
            pass_rate * 100.0
        ));
    }

    let avg_time = run.metrics.performance.avg_execution_time;
    if avg_time > advisories.slow_avg_execution_time {
        recommendations.push(format!(
            "Average test execution time is {:.1}s. Consider optimizing slow tests.",
            avg_time
        ));
    }

    for (category, tally) in &run.metrics.by_category {
        let rate = tally.failure_rate();
        if tally.failed > 0 && rate > advisories.category_failure_rate {
            recommendations.push(format!(
                "{} category has {:.1}% failure rate. Focus on improving {} tests.",
                category,
                rate * 100.0,
                category
            ));
        }
    }

    recommendations
}

pub struct CiRunner {
    runner: TestRunner,
    config: CiConfig,
}

impl CiRunner {
    pub fn new(runner: TestRunner, config: CiConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &CiConfig {
        &self.config
    }

    /// Run the gated test set and write `ci_report.json` next to the results.
    pub async fn run_ci_tests(&self, tests: &[Arc<dyn TestCase>]) -> Result<CiReport> {
        let run = self.runner.run_tests(tests, &self.config.filter(), self.config.fail_fast).await?;
        let report = CiReport::evaluate(&run, &self.config);

        if self.runner.config().persist {
            let path = self.runner.store().output_dir().join(CI_REPORT_FILE);
            write_json_atomic(&path, &report).await?;
        }

        tracing::info!(
            build_status = %report.ci_summary.build_status,
            exit_code = report.exit_code,
            pass_rate = report.ci_summary.pass_rate,
            "CI run complete"
        );
        for gate in report.quality_gates.iter().filter(|g| !g.passed) {
            tracing::warn!(gate = %gate.id, actual = gate.actual, threshold = gate.threshold, "quality gate failed");
        }
        Ok(report)
    }
}
