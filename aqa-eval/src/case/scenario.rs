use super::{TestCase, TestInfo};
use crate::adapter::ScenarioAdapter;
use crate::error::Result;
use crate::metric::{MetricName, MetricResult, MetricSet};
use crate::report::{TestCategory, TestResult, TestSeverity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Verdict of a simulated conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub success: bool,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub passed_criteria: Vec<String>,
    #[serde(default)]
    pub failed_criteria: Vec<String>,
}

/// External framework that simulates a user and judges the conversation
#[async_trait]
pub trait ScenarioRunner: Send + Sync {
    async fn run(&self, adapter: Arc<dyn ScenarioAdapter>, criteria: &[String]) -> Result<ScenarioOutcome>;
}

pub struct ScenarioTest {
    info: TestInfo,
    runner: Arc<dyn ScenarioRunner>,
    adapter: Arc<dyn ScenarioAdapter>,
    criteria: Vec<String>,
}

impl ScenarioTest {
    pub fn new(
        name: impl Into<String>,
        runner: Arc<dyn ScenarioRunner>,
        adapter: Arc<dyn ScenarioAdapter>,
        criteria: Vec<String>,
    ) -> Self {
        Self {
            info: TestInfo::new(name, TestCategory::AgentBehavior, TestSeverity::High),
            runner,
            adapter,
            criteria,
        }
    }

    pub fn with_severity(mut self, severity: TestSeverity) -> Self {
        self.info.severity = severity;
        self
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let outcome = self.runner.run(self.adapter.clone(), &self.criteria).await?;
        let value = if outcome.success { 1.0 } else { 0.0 };

        let mut metrics = MetricSet::new();
        metrics.push(
            MetricResult::new(MetricName::ScenarioSuccess, value, 1.0)
                .with_detail("passed_criteria", json!(outcome.passed_criteria))
                .with_detail("failed_criteria", json!(outcome.failed_criteria)),
        );

        Ok(self
            .info
            .scored(metrics, value, 1.0)
            .with_artifact("criteria", json!(self.criteria))
            .with_artifact("reasoning", json!(outcome.reasoning)))
    }
}

#[async_trait]
impl TestCase for ScenarioTest {
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
    use crate::adapter::{AgentAdapter, AgentInput};
    use crate::case::testing::ScriptedAgent;
    use crate::error::EvalError;
    use aqa_core::{AgentResponse, TranscriptMessage};

    /// Sends one user turn and passes every criterion the reply mentions.
    struct KeywordJudge;

    #[async_trait]
    impl ScenarioRunner for KeywordJudge {
        async fn run(
            &self,
            adapter: Arc<dyn ScenarioAdapter>,
            criteria: &[String],
        ) -> Result<ScenarioOutcome> {
            let input = AgentInput::new("scenario-1", vec![TranscriptMessage::user("Tell me about AI")]);
            let reply = adapter.call(&input).await?;
            let text = reply.iter().map(|m| m.content.to_lowercase()).collect::<Vec<_>>().join(" ");

            let (passed, failed): (Vec<String>, Vec<String>) =
                criteria.iter().cloned().partition(|c| text.contains(&c.to_lowercase()));
            Ok(ScenarioOutcome {
                success: failed.is_empty(),
                reasoning: Some(format!("{} of {} criteria met", passed.len(), criteria.len())),
                passed_criteria: passed,
                failed_criteria: failed,
            })
        }
    }

    struct BrokenRunner;

    #[async_trait]
    impl ScenarioRunner for BrokenRunner {
        async fn run(&self, _: Arc<dyn ScenarioAdapter>, _: &[String]) -> Result<ScenarioOutcome> {
            Err(EvalError::ExecutionError("judge unavailable".to_string()))
        }
    }

    fn adapter(reply: &str) -> Arc<dyn ScenarioAdapter> {
        Arc::new(AgentAdapter::new(Arc::new(ScriptedAgent::replying(
            "sage",
            AgentResponse::text(reply),
        ))))
    }

    #[tokio::test]
    async fn test_successful_scenario() {
        let test = ScenarioTest::new(
            "Scenario_knowledge",
            Arc::new(KeywordJudge),
            adapter("AI is the study of intelligent machines."),
            vec!["intelligent".to_string(), "machines".to_string()],
        );
        let result = test.run().await.unwrap();

        assert!(result.passed);
        assert_eq!(result.category, TestCategory::AgentBehavior);
        assert_eq!(result.metrics.get("scenario_success").unwrap().value(), 1.0);
    }

    #[tokio::test]
    async fn test_failed_criteria_are_reported() {
        let result = ScenarioTest::new(
            "Scenario_knowledge",
            Arc::new(KeywordJudge),
            adapter("No idea."),
            vec!["intelligent".to_string()],
        )
        .run()
        .await
        .unwrap();

        assert!(!result.passed);
        let metric = result.metrics.get("scenario_success").unwrap();
        assert_eq!(metric.details()["failed_criteria"], json!(["intelligent"]));
    }

    #[tokio::test]
    async fn test_runner_error_becomes_failed_result() {
        let result = ScenarioTest::new("Scenario_broken", Arc::new(BrokenRunner), adapter("x"), Vec::new())
            .run()
            .await
            .unwrap();
        assert!(!result.passed);
        assert!(result.error_message.unwrap().contains("judge unavailable"));
    }
}
