//! Test runner
//!
//! Executes test cases in submission order, isolates crashes and timeouts at
//! the test boundary, aggregates the results and persists them.

use crate::case::TestCase;
use crate::error::{EvalError, Result};
use crate::report::{RunReport, TestCategory, TestResult, TestSeverity};
use crate::storage::ResultStore;
use aqa_telemetry::{suite_run_span, test_case_span};
use futures::{FutureExt, StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory for timestamped and latest result files
    pub output_dir: PathBuf,
    /// Per-test budget in seconds covering setup and run; `None` disables it
    pub test_timeout_secs: Option<f64>,
    /// Tests in flight at once; results keep submission order
    pub concurrency: usize,
    /// Write result files after each run
    pub persist: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test_results"),
            test_timeout_secs: Some(30.0),
            concurrency: 1,
            persist: true,
        }
    }
}

impl RunnerConfig {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_timeout(mut self, seconds: Option<f64>) -> Self {
        self.test_timeout_secs = seconds;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    fn timeout(&self) -> Option<Duration> {
        let secs = self.test_timeout_secs?;
        match Duration::try_from_secs_f64(secs) {
            Ok(limit) => Some(limit),
            Err(e) => {
                tracing::warn!(test_timeout_secs = secs, error = %e, "ignoring invalid test timeout");
                None
            }
        }
    }
}

/// Inclusion lists; `None` means no restriction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestFilter {
    pub severities: Option<Vec<TestSeverity>>,
    pub categories: Option<Vec<TestCategory>>,
}

impl TestFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_severities(mut self, severities: Vec<TestSeverity>) -> Self {
        self.severities = Some(severities);
        self
    }

    pub fn with_categories(mut self, categories: Vec<TestCategory>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn matches(&self, test: &dyn TestCase) -> bool {
        let severity_ok = self.severities.as_ref().is_none_or(|s| s.contains(&test.severity()));
        let category_ok = self.categories.as_ref().is_none_or(|c| c.contains(&test.category()));
        severity_ok && category_ok
    }
}

pub struct TestRunner {
    config: RunnerConfig,
    store: ResultStore,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let store = ResultStore::new(config.output_dir.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Execute and, when configured, persist the report.
    pub async fn run_tests(
        &self,
        tests: &[Arc<dyn TestCase>],
        filter: &TestFilter,
        fail_fast: bool,
    ) -> Result<RunReport> {
        let report = self.execute(tests, filter, fail_fast).await;
        if self.config.persist {
            self.store.save(&report).await?;
        }
        Ok(report)
    }

    /// Run the tests selected by `filter` without touching the filesystem.
    ///
    /// With `fail_fast`, the first failed result stops further tests from
    /// starting. Tests already in flight run to completion and are reported;
    /// the rest of the selection is counted as skipped.
    pub async fn execute(
        &self,
        tests: &[Arc<dyn TestCase>],
        filter: &TestFilter,
        fail_fast: bool,
    ) -> RunReport {
        let selected: Vec<Arc<dyn TestCase>> =
            tests.iter().filter(|t| filter.matches(t.as_ref())).cloned().collect();
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now();
        let timeout = self.config.timeout();
        let concurrency = self.config.concurrency.max(1);
        let span = suite_run_span(&run_id, selected.len());

        async {
            tracing::info!(
                selected = selected.len(),
                filtered_out = tests.len() - selected.len(),
                concurrency,
                "starting test run"
            );
            let start = Instant::now();
            let mut results = Vec::with_capacity(selected.len());
            let mut errors = Vec::new();

            let stop = AtomicBool::new(false);
            let mut outcomes = stream::iter(selected.iter().cloned())
                .take_while(|_| future::ready(!stop.load(Ordering::SeqCst)))
                .map(|test| run_one(test, timeout))
                .buffered(concurrency);
            // Tests already in flight when fail-fast trips still finish, so
            // their teardown runs and they count as executed.
            while let Some((result, error)) = outcomes.next().await {
                if fail_fast && !result.passed && !stop.swap(true, Ordering::SeqCst) {
                    tracing::warn!(test.name = %result.test_name, "fail-fast: no further tests will start");
                }
                results.push(result);
                errors.extend(error);
            }
            drop(outcomes);

            let skipped = selected.len() - results.len();
            let report = RunReport::new(
                &run_id,
                started_at,
                results,
                errors,
                skipped,
                start.elapsed().as_secs_f64(),
            );
            tracing::info!(
                total = report.summary.total_tests,
                passed = report.summary.passed,
                failed = report.summary.failed,
                skipped,
                "test run complete"
            );
            report
        }
        .instrument(span)
        .await
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

/// Run one test with setup and teardown; a crash yields a synthesized
/// failed result plus the message for the run's `errors`.
async fn run_one(test: Arc<dyn TestCase>, timeout: Option<Duration>) -> (TestResult, Option<String>) {
    let span = test_case_span(test.name(), test.category().as_str(), test.severity().as_str());

    async move {
        tracing::info!("starting test");
        let start = Instant::now();
        let outcome = guarded_run(test.as_ref(), timeout).await;

        if let Err(e) = test.teardown().await {
            tracing::warn!(error = %e, "teardown failed");
        }

        let elapsed = start.elapsed().as_secs_f64();
        match outcome {
            Ok(result) => {
                tracing::info!(passed = result.passed, score = ?result.score, elapsed, "test finished");
                (result, None)
            }
            Err(message) => {
                tracing::error!(error = %message, elapsed, "test crashed");
                let result =
                    TestResult::error(test.name(), test.category(), test.severity(), message.clone())
                        .with_execution_time(elapsed);
                (result, Some(format!("{}: {}", test.name(), message)))
            }
        }
    }
    .instrument(span)
    .await
}

async fn guarded_run(test: &dyn TestCase, timeout: Option<Duration>) -> std::result::Result<TestResult, String> {
    let work = AssertUnwindSafe(async {
        test.setup()
            .await
            .map_err(|e| EvalError::ExecutionError(format!("setup failed: {}", e)))?;
        test.run().await
    })
    .catch_unwind();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| EvalError::TimeoutError(limit.as_secs_f64()).to_string())?,
        None => work.await,
    };

    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("Test panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricName, MetricResult, MetricSet};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Copy)]
    enum Behavior {
        Pass,
        Fail,
        Error,
        Panic,
        Hang,
        Slow,
        SetupError,
    }

    struct StubCase {
        name: String,
        severity: TestSeverity,
        behavior: Behavior,
        setups: Arc<AtomicUsize>,
        teardowns: Arc<AtomicUsize>,
    }

    fn stub(name: &str, behavior: Behavior) -> StubCase {
        StubCase {
            name: name.to_string(),
            severity: TestSeverity::High,
            behavior,
            setups: Arc::new(AtomicUsize::new(0)),
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[async_trait]
    impl TestCase for StubCase {
        fn name(&self) -> &str {
            &self.name
        }

        fn category(&self) -> TestCategory {
            TestCategory::RagCore
        }

        fn severity(&self) -> TestSeverity {
            self.severity
        }

        async fn setup(&self) -> Result<()> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::SetupError => Err(EvalError::ConfigError("no fixture".to_string())),
                _ => Ok(()),
            }
        }

        async fn run(&self) -> Result<TestResult> {
            let value = match self.behavior {
                Behavior::Pass | Behavior::SetupError => 1.0,
                Behavior::Fail => 0.0,
                Behavior::Error => return Err(EvalError::ExecutionError("exploded".to_string())),
                Behavior::Panic => panic!("boom"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    1.0
                }
                Behavior::Slow => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    1.0
                }
            };
            let mut metrics = MetricSet::new();
            metrics.push(MetricResult::new(MetricName::Faithfulness, value, 0.8));
            Ok(TestResult::from_metrics(
                &self.name,
                TestCategory::RagCore,
                self.severity,
                metrics,
                value,
                0.8,
            ))
        }

        async fn teardown(&self) -> Result<()> {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runner() -> TestRunner {
        TestRunner::new(RunnerConfig::default().with_persist(false).with_timeout(Some(5.0)))
    }

    #[tokio::test]
    async fn test_preserves_order_and_counts() {
        let tests: Vec<Arc<dyn TestCase>> = vec![
            Arc::new(stub("a", Behavior::Pass)),
            Arc::new(stub("b", Behavior::Fail)),
            Arc::new(stub("c", Behavior::Pass)),
        ];
        let report = runner().execute(&tests, &TestFilter::all(), false).await;

        let names: Vec<&str> = report.test_results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(report.summary.total_tests, 3);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_crashes_are_isolated() {
        let tests: Vec<Arc<dyn TestCase>> = vec![
            Arc::new(stub("error", Behavior::Error)),
            Arc::new(stub("panic", Behavior::Panic)),
            Arc::new(stub("setup", Behavior::SetupError)),
            Arc::new(stub("ok", Behavior::Pass)),
        ];
        let report = runner().execute(&tests, &TestFilter::all(), false).await;

        assert_eq!(report.summary.total_tests, 4);
        assert_eq!(report.summary.failed, 3);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[1].contains("panicked: boom"));
        assert!(report.test_results[2].error_message.as_ref().unwrap().contains("setup failed"));
        assert!(report.test_results[3].passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure() {
        let hanging = stub("hang", Behavior::Hang);
        let teardowns = hanging.teardowns.clone();
        let tests: Vec<Arc<dyn TestCase>> = vec![Arc::new(hanging)];

        let report = runner().execute(&tests, &TestFilter::all(), false).await;
        let result = &report.test_results[0];
        assert!(!result.passed);
        assert!(result.error_message.as_ref().unwrap().contains("Timed out after 5.00s"));
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_fast_stops() {
        let tests: Vec<Arc<dyn TestCase>> = vec![
            Arc::new(stub("a", Behavior::Pass)),
            Arc::new(stub("b", Behavior::Fail)),
            Arc::new(stub("c", Behavior::Pass)),
            Arc::new(stub("d", Behavior::Pass)),
        ];
        let report = runner().execute(&tests, &TestFilter::all(), true).await;

        assert_eq!(report.test_results.len(), 2);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.test_results[1].test_name, "b");
    }

    #[tokio::test]
    async fn test_filter_by_severity() {
        let mut low = stub("low", Behavior::Pass);
        low.severity = TestSeverity::Low;
        let tests: Vec<Arc<dyn TestCase>> =
            vec![Arc::new(stub("high", Behavior::Pass)), Arc::new(low)];

        let filter = TestFilter::all().with_severities(vec![TestSeverity::Critical, TestSeverity::High]);
        let report = runner().execute(&tests, &filter, false).await;
        assert_eq!(report.summary.total_tests, 1);
        assert_eq!(report.test_results[0].test_name, "high");

        let filter = TestFilter::all().with_categories(vec![TestCategory::Performance]);
        let report = runner().execute(&tests, &filter, false).await;
        assert_eq!(report.summary.total_tests, 0);
        assert_eq!(report.summary.pass_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_order() {
        let tests: Vec<Arc<dyn TestCase>> =
            (0..6).map(|i| Arc::new(stub(&format!("t{}", i), Behavior::Pass)) as Arc<dyn TestCase>).collect();
        let runner = TestRunner::new(RunnerConfig::default().with_persist(false).with_concurrency(3));
        let report = runner.execute(&tests, &TestFilter::all(), false).await;
        let names: Vec<&str> = report.test_results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, ["t0", "t1", "t2", "t3", "t4", "t5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fail_fast_finishes_tests_in_flight() {
        let setups = Arc::new(AtomicUsize::new(0));
        let teardowns = Arc::new(AtomicUsize::new(0));
        let tests: Vec<Arc<dyn TestCase>> = [
            ("a", Behavior::Fail),
            ("b", Behavior::Slow),
            ("c", Behavior::Slow),
            ("d", Behavior::Pass),
        ]
        .into_iter()
        .map(|(name, behavior)| {
            let mut case = stub(name, behavior);
            case.setups = setups.clone();
            case.teardowns = teardowns.clone();
            Arc::new(case) as Arc<dyn TestCase>
        })
        .collect();

        let runner = TestRunner::new(
            RunnerConfig::default().with_persist(false).with_timeout(Some(5.0)).with_concurrency(3),
        );
        let report = runner.execute(&tests, &TestFilter::all(), true).await;

        assert_eq!(setups.load(Ordering::SeqCst), 3);
        assert_eq!(teardowns.load(Ordering::SeqCst), 3);
        let names: Vec<&str> = report.test_results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_run_tests_persists() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner::new(RunnerConfig::default().with_output_dir(dir.path()));
        let tests: Vec<Arc<dyn TestCase>> = vec![Arc::new(stub("a", Behavior::Pass))];

        let report = runner.run_tests(&tests, &TestFilter::all(), false).await.unwrap();
        let latest = runner.store().load_latest().await.unwrap();
        assert_eq!(latest.run_id, report.run_id);
        assert_eq!(latest.summary.passed, 1);
    }

    #[test]
    fn test_invalid_timeout_is_ignored() {
        let config = RunnerConfig::default().with_timeout(Some(-1.0));
        assert!(config.timeout().is_none());
        assert_eq!(RunnerConfig::default().timeout(), Some(Duration::from_secs(30)));
    }
}
