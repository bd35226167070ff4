use super::{TestCase, TestInfo, invoke_agent};
use crate::error::{EvalError, Result};
use crate::metric::{MetricName, MetricResult, MetricSet};
use crate::report::{TestCategory, TestResult, TestSeverity};
use aqa_core::{Agent, RunOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

/// Which collaborator a step is sent to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepTarget {
    Agent { agent: String },
    Team { team: String },
}

impl StepTarget {
    fn kind(&self) -> &'static str {
        match self {
            StepTarget::Agent { .. } => "agent",
            StepTarget::Team { .. } => "team",
        }
    }

    fn target(&self) -> &str {
        match self {
            StepTarget::Agent { agent } => agent,
            StepTarget::Team { team } => team,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(flatten)]
    pub target: StepTarget,
    pub message: String,
    #[serde(default)]
    pub kwargs: RunOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ScenarioStep {
    pub fn agent(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Agent { agent: agent.into() },
            message: message.into(),
            kwargs: RunOptions::new(),
            name: None,
        }
    }

    pub fn team(team: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: StepTarget::Team { team: team.into() },
            message: message.into(),
            kwargs: RunOptions::new(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: RunOptions) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Explicit name, or `{type}_{target}`.
    pub fn step_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.target.kind(), self.target.target()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutcomes {
    /// Seconds the whole scenario may take; 60 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_time: Option<f64>,
    /// Informational: reported per deliverable in the `deliverables`
    /// artifact, never scored
    #[serde(default)]
    pub deliverables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<ScenarioStep>,
    #[serde(default)]
    pub expected_outcomes: ExpectedOutcomes,
}

/// End-to-end workflow across agents and teams
///
/// Steps run in order. A failed step is recorded and the scenario carries
/// on, so `step_completion` reflects every step.
pub struct SystemIntegrationTest {
    info: TestInfo,
    scenario: SystemScenario,
    agents: Vec<Arc<dyn Agent>>,
    teams: Vec<Arc<dyn Agent>>,
}

impl SystemIntegrationTest {
    pub const THRESHOLD: f64 = 0.9;
    pub const DEFAULT_MAX_EXECUTION_TIME: f64 = 60.0;

    pub fn new(
        scenario: SystemScenario,
        agents: Vec<Arc<dyn Agent>>,
        teams: Vec<Arc<dyn Agent>>,
    ) -> Self {
        let name = format!("System_Integration_{}", scenario.name);
        Self {
            info: TestInfo::new(name, TestCategory::RagCore, TestSeverity::Critical),
            scenario,
            agents,
            teams,
        }
    }

    pub fn with_severity(mut self, severity: TestSeverity) -> Self {
        self.info.severity = severity;
        self
    }

    fn resolve(&self, target: &StepTarget) -> Option<&Arc<dyn Agent>> {
        let pool = match target {
            StepTarget::Agent { .. } => &self.agents,
            StepTarget::Team { .. } => &self.teams,
        };
        pool.iter().find(|candidate| candidate.name() == target.target())
    }

    async fn run_step(&self, step: &ScenarioStep) -> Value {
        let Some(collaborator) = self.resolve(&step.target) else {
            return json!({
                "success": false,
                "error": format!("Unknown {} '{}'", step.target.kind(), step.target.target()),
            });
        };

        match invoke_agent(collaborator.as_ref(), &step.message, &step.kwargs).await {
            Ok((response, elapsed)) => json!({
                "success": true,
                "response": response.content,
                "execution_time": elapsed,
            }),
            Err(e) => {
                tracing::warn!(step = %step.step_name(), error = %e, "scenario step failed");
                json!({ "success": false, "error": e.to_string() })
            }
        }
    }

    async fn evaluate(&self) -> Result<TestResult> {
        let steps = &self.scenario.steps;
        if steps.is_empty() {
            return Err(EvalError::ConfigError(format!(
                "Scenario '{}' has no steps",
                self.scenario.name
            )));
        }

        let start = Instant::now();
        let mut step_results = Map::new();
        let mut completed = 0usize;
        for step in steps {
            let outcome = self.run_step(step).await;
            if outcome["success"] == true {
                completed += 1;
            }
            step_results.insert(step.step_name(), outcome);
        }
        let total_time = start.elapsed().as_secs_f64();

        let completion = completed as f64 / steps.len() as f64;
        let max_time = self
            .scenario
            .expected_outcomes
            .max_execution_time
            .unwrap_or(Self::DEFAULT_MAX_EXECUTION_TIME);

        let deliverables = deliverables_found(&self.scenario.expected_outcomes.deliverables, &step_results);

        let mut metrics = MetricSet::new();
        metrics.push(
            MetricResult::new(MetricName::StepCompletion, completion, 1.0)
                .with_detail("completed_steps", completed)
                .with_detail("total_steps", steps.len()),
        );
        let timing = MetricResult::new(MetricName::TimingConstraint, total_time, max_time);
        let timing_score = if timing.passed() { 1.0 } else { 0.5 };
        metrics.push(timing);

        let score = (completion + timing_score) / 2.0;
        Ok(self
            .info
            .scored(metrics, score, Self::THRESHOLD)
            .with_artifact("scenario", json!(self.scenario))
            .with_artifact("step_results", Value::Object(step_results))
            .with_artifact("deliverables", Value::Object(deliverables))
            .with_artifact("total_execution_time", total_time))
    }
}

/// Whether any step response mentions each deliverable, with `_` read as a
/// space and case ignored.
fn deliverables_found(deliverables: &[String], step_results: &Map<String, Value>) -> Map<String, Value> {
    let responses: Vec<String> = step_results
        .values()
        .filter_map(|outcome| outcome["response"].as_str())
        .map(str::to_lowercase)
        .collect();

    deliverables
        .iter()
        .map(|deliverable| {
            let wanted = deliverable.to_lowercase();
            let spaced = wanted.replace('_', " ");
            let found = responses.iter().any(|r| r.contains(&wanted) || r.contains(&spaced));
            (deliverable.clone(), Value::Bool(found))
        })
        .collect()
}

#[async_trait]
impl TestCase for SystemIntegrationTest {
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
    use aqa_core::AgentResponse;

    fn scenario(steps: Vec<ScenarioStep>) -> SystemScenario {
        SystemScenario {
            name: "core_functionality".to_string(),
            description: "Knowledge lookup then team report".to_string(),
            steps,
            expected_outcomes: ExpectedOutcomes::default(),
        }
    }

    fn collaborators() -> (Vec<Arc<dyn Agent>>, Vec<Arc<dyn Agent>>) {
        let sage: Arc<dyn Agent> =
            Arc::new(ScriptedAgent::replying("sage", AgentResponse::text("AI is a field.")));
        let team: Arc<dyn Agent> = Arc::new(ScriptedAgent::replying(
            "finance_researcher",
            AgentResponse::text("Report ready."),
        ));
        (vec![sage], vec![team])
    }

    #[test]
    fn test_step_deserialization() {
        let step: ScenarioStep = serde_json::from_value(json!({
            "type": "team",
            "team": "finance_researcher",
            "message": "Analyze AAPL",
        }))
        .unwrap();
        assert_eq!(step.target, StepTarget::Team { team: "finance_researcher".to_string() });
        assert_eq!(step.step_name(), "team_finance_researcher");
        assert!(step.kwargs.is_empty());
    }

    #[tokio::test]
    async fn test_all_steps_complete() {
        let (agents, teams) = collaborators();
        let test = SystemIntegrationTest::new(
            scenario(vec![
                ScenarioStep::agent("sage", "What is AI?").with_name("knowledge_lookup"),
                ScenarioStep::team("finance_researcher", "Analyze AAPL"),
            ]),
            agents,
            teams,
        );
        assert_eq!(test.name(), "System_Integration_core_functionality");

        let result = test.run().await.unwrap();
        assert!(result.passed, "{:?}", result.metrics);
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.metrics.get("timing_constraint").unwrap().threshold(), 60.0);
        let steps = result.artifacts["step_results"].as_object().unwrap();
        assert!(steps.contains_key("knowledge_lookup"));
        assert!(steps.contains_key("team_finance_researcher"));
    }

    #[tokio::test]
    async fn test_deliverables_are_reported_but_not_scored() {
        let (agents, teams) = collaborators();
        let mut scenario = scenario(vec![
            ScenarioStep::agent("sage", "What is AI?"),
            ScenarioStep::team("finance_researcher", "Analyze AAPL"),
        ]);
        scenario.expected_outcomes.deliverables =
            vec!["report_ready".to_string(), "spanish_translation".to_string()];

        let result = SystemIntegrationTest::new(scenario, agents, teams).run().await.unwrap();

        assert!(result.passed);
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.artifacts["deliverables"]["report_ready"], true);
        assert_eq!(result.artifacts["deliverables"]["spanish_translation"], false);
    }

    #[tokio::test]
    async fn test_unknown_target_is_a_failed_step() {
        let (agents, teams) = collaborators();
        let result = SystemIntegrationTest::new(
            scenario(vec![
                ScenarioStep::agent("sage", "What is AI?"),
                ScenarioStep::agent("ghost", "Hello?"),
            ]),
            agents,
            teams,
        )
        .run()
        .await
        .unwrap();

        assert!(!result.passed);
        assert_eq!(result.metrics.get("step_completion").unwrap().value(), 0.5);
        assert_eq!(result.score, Some(0.75));
        let error = result.artifacts["step_results"]["agent_ghost"]["error"].as_str().unwrap();
        assert!(error.contains("ghost"));
    }

    #[tokio::test]
    async fn test_failing_agent_step() {
        let agents: Vec<Arc<dyn Agent>> = vec![Arc::new(ScriptedAgent::failing("sage"))];
        let result = SystemIntegrationTest::new(
            scenario(vec![ScenarioStep::agent("sage", "What is AI?")]),
            agents,
            Vec::new(),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(result.metrics.get("step_completion").unwrap().value(), 0.0);
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_zero_steps_fails_explicitly() {
        let result = SystemIntegrationTest::new(scenario(Vec::new()), Vec::new(), Vec::new())
            .run()
            .await
            .unwrap();
        assert!(!result.passed);
        assert!(result.error_message.unwrap().contains("no steps"));
    }
}
