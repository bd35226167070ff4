use super::{TestCase, TestInfo, invoke_agent};
use crate::criteria::{MetricThresholds, MetricsConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::fixtures::TestData;
use crate::metric::MetricSet;
use crate::report::{TestCategory, TestResult, TestSeverity};
use crate::scoring::RagMetrics;
use aqa_core::{Agent, RunOptions};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Retrieval quality of a RAG agent: context relevance, answer relevance
/// and faithfulness to the fixture context.
pub struct RagValidationTest {
    info: TestInfo,
    agent: Arc<dyn Agent>,
    data: TestData,
    metrics: RagMetrics,
    thresholds: MetricThresholds,
}

impl RagValidationTest {
    pub const THRESHOLD: f64 = 0.7;

    pub fn new(agent: Arc<dyn Agent>, data: TestData) -> Self {
        let name = format!("RAG_Validation_{}", data.metadata_str("category", "general"));
        Self {
            info: TestInfo::new(name, TestCategory::RagCore, TestSeverity::High),
            agent,
            data,
            metrics: RagMetrics::default(),
            thresholds: MetricThresholds::default(),
        }
    }

    pub fn with_severity(mut self, severity: TestSeverity) -> Self {
        self.info.severity = severity;
        self
    }

    pub fn with_config(mut self, config: &MetricsConfig) -> Self {
        self.metrics = self.metrics.with_heuristics(config.heuristics.clone());
        self.thresholds = config.thresholds.clone();
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.metrics = self.metrics.with_embedder(embedder);
        self
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let query = self.data.input_str("query")?;
        let (response, agent_time) =
            invoke_agent(self.agent.as_ref(), query, &RunOptions::new()).await?;
        let answer = response.content.as_str();

        let contexts: Vec<String> = if !response.contexts.is_empty() {
            response.contexts.clone()
        } else {
            self.data.context.iter().cloned().collect()
        };

        let mut metrics = MetricSet::new();
        if !contexts.is_empty() {
            metrics.push(self.metrics.context_relevance(
                query,
                &contexts,
                self.thresholds.context_relevance,
            ));
        }
        metrics.push(self.metrics.answer_relevance(query, answer, self.thresholds.answer_relevance));
        if let Some(context) = &self.data.context {
            metrics.push(self.metrics.faithfulness(context, answer, self.thresholds.faithfulness));
        }

        let score = metrics.mean_value().unwrap_or(0.0);
        Ok(self
            .info
            .scored(metrics, score, Self::THRESHOLD)
            .with_artifact("query", query)
            .with_artifact("answer", answer)
            .with_artifact("contexts", json!(contexts))
            .with_artifact("agent_execution_time", agent_time))
    }
}

#[async_trait]
impl TestCase for RagValidationTest {
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

    #[tokio::test]
    async fn test_grounded_answer_passes_faithfulness() {
        let data = TestDataFactory::rag().remove(0);
        let context = data.context.clone().unwrap();
        let agent = Arc::new(ScriptedAgent::replying("sage", AgentResponse::text(context)));

        let test = RagValidationTest::new(agent, data);
        assert_eq!(test.name(), "RAG_Validation_definition");

        let result = test.run().await.unwrap();
        assert!(result.error_message.is_none());
        assert_eq!(result.metrics.get("faithfulness").unwrap().value(), 1.0);
        assert!(result.metrics.get("context_relevance").is_some());
        assert_eq!(result.threshold, Some(0.7));
        assert_eq!(result.artifacts["query"], "What is artificial intelligence?");
    }

    #[tokio::test]
    async fn test_agent_contexts_take_precedence() {
        let data = TestDataFactory::rag().remove(1);
        let response = AgentResponse::text("Machine learning learns from data.")
            .with_contexts(vec!["first".to_string(), "second".to_string()]);
        let agent = Arc::new(ScriptedAgent::replying("sage", response));

        let result = RagValidationTest::new(agent, data).run().await.unwrap();
        let relevance = result.metrics.get("context_relevance").unwrap();
        assert_eq!(relevance.details()["num_contexts"], 2);
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_error_result() {
        let data = TestDataFactory::rag().remove(0);
        let agent = Arc::new(ScriptedAgent::failing("sage"));

        let result = RagValidationTest::new(agent, data)
            .with_severity(TestSeverity::Critical)
            .run()
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.severity, TestSeverity::Critical);
        assert!(result.error_message.unwrap().contains("Agent execution failed"));
    }

    #[tokio::test]
    async fn test_missing_query_is_reported() {
        let data = TestData::new(json!({"message": "hi"}), json!({}));
        let agent = Arc::new(ScriptedAgent::replying("sage", AgentResponse::text("hello")));

        let result = RagValidationTest::new(agent, data).run().await.unwrap();
        assert_eq!(result.test_name, "RAG_Validation_general");
        assert!(result.error_message.unwrap().contains("query"));
    }
}
