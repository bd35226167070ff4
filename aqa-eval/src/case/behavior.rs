use super::{TestCase, TestInfo, invoke_agent};
use crate::criteria::{HeuristicConfig, MetricThresholds, MetricsConfig};
use crate::error::{EvalError, Result};
use crate::fixtures::TestData;
use crate::metric::MetricSet;
use crate::report::{TestCategory, TestResult, TestSeverity};
use crate::scoring::AgentMetrics;
use crate::scoring::agent::expected_tools;
use aqa_core::{Agent, AgentResponse};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

/// Task completion of a single agent: goal attainment, tool usage and
/// coherence of the reply.
pub struct AgentBehaviorTest {
    info: TestInfo,
    agent: Arc<dyn Agent>,
    data: TestData,
    metrics: AgentMetrics,
    thresholds: MetricThresholds,
}

impl AgentBehaviorTest {
    pub const THRESHOLD: f64 = 0.8;

    pub fn new(agent: Arc<dyn Agent>, data: TestData) -> Self {
        let name = format!("Agent_Behavior_{}", data.metadata_str("scenario", "general"));
        Self {
            info: TestInfo::new(name, TestCategory::AgentBehavior, TestSeverity::High),
            agent,
            data,
            metrics: AgentMetrics::new(HeuristicConfig::default()),
            thresholds: MetricThresholds::default(),
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

    pub fn with_config(mut self, config: &MetricsConfig) -> Self {
        self.metrics = AgentMetrics::new(config.heuristics.clone());
        self.thresholds = config.thresholds.clone();
        self
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let message = self.data.input_str("message")?;
        let options: Map<String, Value> = self
            .data
            .input_data
            .iter()
            .filter(|(key, _)| key.as_str() != "message")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let (response, agent_time) = invoke_agent(self.agent.as_ref(), message, &options).await?;
        let actual = actual_outcome(&response, agent_time);
        let expected = &self.data.expected_output;

        let mut metrics = MetricSet::new();
        metrics.push(self.metrics.goal_attainment(expected, &actual, self.thresholds.goal_attainment));

        if expected.contains_key("tools_used") {
            let tools = expected_tools(expected).ok_or_else(|| {
                EvalError::ParseError("expected_output.tools_used must be a list".to_string())
            })?;
            metrics.push(self.metrics.tool_utilization(
                &tools,
                &response.tool_calls,
                self.thresholds.tool_utilization,
            ));
        }

        metrics.push(
            self.metrics.response_coherence(&response.content, self.thresholds.response_coherence),
        );

        let score = metrics.mean_value().unwrap_or(0.0);
        Ok(self
            .info
            .scored(metrics, score, Self::THRESHOLD)
            .with_artifact("message", message)
            .with_artifact("response", response.content.as_str())
            .with_artifact("expected_outcome", Value::Object(expected.clone()))
            .with_artifact("actual_outcome", Value::Object(actual))
            .with_artifact("agent_execution_time", agent_time))
    }
}

/// Agent-reported outcome enriched with what can be observed from the response.
fn actual_outcome(response: &AgentResponse, response_time: f64) -> Map<String, Value> {
    let mut outcome = response.outcome.clone();
    if !response.tool_calls.is_empty() {
        let calls: Vec<Value> =
            response.tool_calls.iter().map(|c| json!({ "tool_name": c.tool_name })).collect();
        outcome.insert("tool_calls".to_string(), Value::Array(calls));
    }
    outcome.insert("response_generated".to_string(), json!(!response.content.is_empty()));
    outcome.insert("response_length".to_string(), json!(response.content.chars().count()));
    outcome.insert("response_time".to_string(), json!(response_time));
    outcome
}

#[async_trait]
impl TestCase for AgentBehaviorTest {
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
    use aqa_core::ToolCall;

    #[tokio::test]
    async fn test_booking_scenario() {
        let data = TestDataFactory::agent_behavior().remove(0);
        let response = AgentResponse::text(
            "I searched for flights from NYC to LAX. Your booking_confirmation is ready.",
        )
        .with_tool_calls(vec![ToolCall::new("flight_search"), ToolCall::new("booking_api")])
        .with_outcome("booking_attempted", json!(true))
        .with_outcome("tools_used", json!(["flight_search", "booking_api"]))
        .with_outcome("response_type", json!("booking_confirmation"));
        let agent = Arc::new(ScriptedAgent::replying("sage", response));

        let test = AgentBehaviorTest::new(agent.clone(), data);
        assert_eq!(test.name(), "Agent_Behavior_simple_booking");
        let result = test.run().await.unwrap();

        assert_eq!(result.metrics.get("goal_attainment").unwrap().value(), 1.0);
        assert_eq!(result.metrics.get("tool_utilization").unwrap().value(), 1.0);
        assert!(result.passed, "{:?}", result.metrics);

        // Everything except the message is forwarded as run options.
        let calls = agent.calls.lock().unwrap();
        assert_eq!(calls[0].0, "Book me a flight from NYC to LAX tomorrow");
        assert!(calls[0].1.contains_key("user_preferences"));
        assert!(!calls[0].1.contains_key("message"));
    }

    #[tokio::test]
    async fn test_missing_tools_fail() {
        let data = TestDataFactory::agent_behavior().remove(1);
        let agent = Arc::new(ScriptedAgent::replying(
            "sage",
            AgentResponse::text("I could not find anything for you today."),
        ));

        let result = AgentBehaviorTest::new(agent, data).run().await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.metrics.get("tool_utilization").unwrap().value(), 0.0);
        assert_eq!(result.artifacts["actual_outcome"]["response_generated"], true);
    }

    #[tokio::test]
    async fn test_malformed_tools_used() {
        let data = TestData::new(json!({"message": "hi"}), json!({"tools_used": "search"}));
        let agent = Arc::new(ScriptedAgent::replying("sage", AgentResponse::text("Hello there.")));

        let result = AgentBehaviorTest::new(agent, data).run().await.unwrap();
        assert!(result.error_message.unwrap().contains("tools_used"));
    }
}
