use super::{TestCase, TestInfo, invoke_agent};
use crate::error::{EvalError, Result};
use crate::fixtures::TestData;
use crate::metric::{MetricName, MetricResult, MetricSet};
use crate::report::{TestCategory, TestResult, TestSeverity};
use aqa_core::{Agent, RunOptions};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

/// Response time of a single agent call against `input_data.expected_response_time`
///
/// The test score is the latency itself, compared with the same budget.
pub struct LatencyTest {
    info: TestInfo,
    agent: Arc<dyn Agent>,
    data: TestData,
}

impl LatencyTest {
    pub const DEFAULT_RESPONSE_TIME: f64 = 2.0;

    pub fn new(agent: Arc<dyn Agent>, data: TestData) -> Self {
        Self {
            info: TestInfo::new("Performance_latency", TestCategory::Performance, TestSeverity::Medium),
            agent,
            data,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    pub fn with_severity(mut self, severity: TestSeverity) -> Self {
        self.info.severity = severity;
        self
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let query = self.data.input_str("query")?;
        let budget = self.data.input_f64("expected_response_time", Self::DEFAULT_RESPONSE_TIME);
        let (response, latency) =
            invoke_agent(self.agent.as_ref(), query, &RunOptions::new()).await?;

        let mut metrics = MetricSet::new();
        metrics.push(
            MetricResult::new(MetricName::ResponseLatency, latency, budget)
                .with_detail("response_length", response.content.chars().count()),
        );

        Ok(self
            .info
            .scored(metrics, latency, budget)
            .with_artifact("query", query)
            .with_artifact("response", response.content.as_str())
            .with_artifact("agent_execution_time", latency))
    }
}

#[async_trait]
impl TestCase for LatencyTest {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn category(&self) -> TestCategory {
        self.info.category
    }

    fn severity(&self) -> TestSeverity {
        self.info.severity
    }

    async fn run(&self) -> Result<TestResult> {
        let start = Instant::now();
        Ok(self.info.finish(self.evaluate().await, start))
    }
}

/// Issues `input_data.concurrent_queries` calls at once and measures
/// successful queries per second.
pub struct ThroughputTest {
    info: TestInfo,
    agent: Arc<dyn Agent>,
    data: TestData,
}

impl ThroughputTest {
    pub const DEFAULT_THROUGHPUT: f64 = 5.0;
    pub const THRESHOLD: f64 = 1.0;

    pub fn new(agent: Arc<dyn Agent>, data: TestData) -> Self {
        Self {
            info: TestInfo::new("Performance_throughput", TestCategory::Performance, TestSeverity::Medium),
            agent,
            data,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    pub fn with_severity(mut self, severity: TestSeverity) -> Self {
        self.info.severity = severity;
        self
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let query = self.data.input_str("query")?;
        let concurrent = self.data.input_f64("concurrent_queries", 0.0).max(0.0) as usize;
        if concurrent == 0 {
            return Err(EvalError::ConfigError(
                "concurrent_queries must be a positive number".to_string(),
            ));
        }
        let expected = self.data.input_f64("expected_throughput", Self::DEFAULT_THROUGHPUT);

        let options = RunOptions::new();
        let start = Instant::now();
        let outcomes =
            join_all((0..concurrent).map(|_| invoke_agent(self.agent.as_ref(), query, &options))).await;
        let elapsed = start.elapsed().as_secs_f64();

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        let errors: Vec<String> =
            outcomes.iter().filter_map(|o| o.as_ref().err()).map(ToString::to_string).collect();
        let throughput = succeeded as f64 / elapsed.max(f64::EPSILON);
        let success_rate = succeeded as f64 / concurrent as f64;

        let mut metrics = MetricSet::new();
        metrics.push(
            MetricResult::new(MetricName::Throughput, throughput, expected)
                .with_detail("elapsed_seconds", elapsed)
                .with_detail("successful_queries", succeeded),
        );
        metrics.push(
            MetricResult::new(MetricName::QuerySuccessRate, success_rate, 1.0)
                .with_detail("failed_queries", concurrent - succeeded)
                .with_detail("errors", errors),
        );

        let score = ((throughput / expected).min(1.0) + success_rate) / 2.0;
        Ok(self
            .info
            .scored(metrics, score, Self::THRESHOLD)
            .with_artifact("query", query)
            .with_artifact("concurrent_queries", concurrent)
            .with_artifact("total_time", elapsed))
    }
}

#[async_trait]
impl TestCase for ThroughputTest {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn category(&self) -> TestCategory {
        self.info.category
    }

    fn severity(&self) -> TestSeverity {
        self.info.severity
    }

    async fn run(&self) -> Result<TestResult> {
        let start = Instant::now();
        Ok(self.info.finish(self.evaluate().await, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::testing::ScriptedAgent;
    use crate::fixtures::TestDataFactory;
    use aqa_core::AgentResponse;
    use serde_json::json;

    fn fast_agent() -> Arc<ScriptedAgent> {
        Arc::new(ScriptedAgent::replying("sage", AgentResponse::text("Done.")))
    }

    #[tokio::test]
    async fn test_latency_within_budget() {
        let data = TestDataFactory::performance().remove(0);
        let test = LatencyTest::new(fast_agent(), data).with_name("Performance_latency_1");
        assert_eq!(test.name(), "Performance_latency_1");
        assert_eq!(test.severity(), TestSeverity::Medium);

        let result = test.run().await.unwrap();
        assert!(result.passed);
        let latency = result.metrics.get("response_latency").unwrap();
        assert_eq!(latency.threshold(), 2.0);
        assert!(latency.value() < 2.0);
    }

    #[tokio::test]
    async fn test_latency_over_budget() {
        let data = TestData::new(json!({"query": "q", "expected_response_time": 0.0}), json!({}));
        let result = LatencyTest::new(fast_agent(), data).run().await.unwrap();
        let latency = result.metrics.get("response_latency").unwrap();
        assert_eq!(latency.passed(), latency.value() <= 0.0);
    }

    #[tokio::test]
    async fn test_throughput_calls_every_query() {
        let data = TestDataFactory::performance().remove(1);
        let agent = fast_agent();
        let result = ThroughputTest::new(agent.clone(), data).run().await.unwrap();

        assert_eq!(agent.calls.lock().unwrap().len(), 10);
        assert_eq!(result.metrics.get("query_success_rate").unwrap().value(), 1.0);
        assert_eq!(result.artifacts["concurrent_queries"], 10);
    }

    #[tokio::test]
    async fn test_throughput_failures_lower_success_rate() {
        let data = TestDataFactory::performance().remove(1);
        let result = ThroughputTest::new(Arc::new(ScriptedAgent::failing("sage")), data)
            .run()
            .await
            .unwrap();
        let success = result.metrics.get("query_success_rate").unwrap();
        assert_eq!(success.value(), 0.0);
        assert_eq!(success.details()["errors"].as_array().unwrap().len(), 10);
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_throughput_requires_queries() {
        let data = TestData::new(json!({"query": "q", "concurrent_queries": 0}), json!({}));
        let result = ThroughputTest::new(fast_agent(), data).run().await.unwrap();
        assert!(result.error_message.unwrap().contains("concurrent_queries"));
    }
}
