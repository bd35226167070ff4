use super::{TestCase, TestInfo, invoke_agent};
use crate::criteria::{HeuristicConfig, MetricThresholds, MetricsConfig};
use crate::error::Result;
use crate::fixtures::TestData;
use crate::metric::{MetricName, MetricResult, MetricSet};
use crate::report::{TestCategory, TestResult, TestSeverity};
use crate::scoring::AgentMetrics;
use aqa_core::{Agent, AgentResponse, RunOptions};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Multi-agent collaboration: the team's goal attainment, the coherence of
/// its final deliverable and how well members and sections match
/// expectations.
pub struct TeamOrchestrationTest {
    info: TestInfo,
    team: Arc<dyn Agent>,
    data: TestData,
    metrics: AgentMetrics,
    thresholds: MetricThresholds,
}

impl TeamOrchestrationTest {
    pub const THRESHOLD: f64 = 0.7;

    pub fn new(team: Arc<dyn Agent>, data: TestData) -> Self {
        let name = format!("Team_Orchestration_{}", data.metadata_str("scenario", "general"));
        Self {
            info: TestInfo::new(name, TestCategory::TeamOrchestration, TestSeverity::High),
            team,
            data,
            metrics: AgentMetrics::new(HeuristicConfig::default()),
            thresholds: MetricThresholds::default(),
        }
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
        let request = self.data.input_str("request")?;
        let (response, team_time) =
            invoke_agent(self.team.as_ref(), request, &RunOptions::new()).await?;
        let actual = team_outcome(&response);
        let expected = &self.data.expected_output;

        let mut metrics = MetricSet::new();
        metrics.insert(
            "team_goal_attainment",
            self.metrics.goal_attainment(expected, &actual, self.thresholds.goal_attainment),
        );
        metrics.insert(
            "team_response_coherence",
            self.metrics.response_coherence(&response.content, self.thresholds.response_coherence),
        );
        metrics.push(collaboration_effectiveness(&response, expected, self.thresholds.collaboration));

        let score = metrics.mean_value().unwrap_or(0.0);
        Ok(self
            .info
            .scored(metrics, score, Self::THRESHOLD)
            .with_artifact("request", request)
            .with_artifact("team_response", response.content.as_str())
            .with_artifact("expected_outcome", Value::Object(expected.clone()))
            .with_artifact("actual_outcome", Value::Object(actual))
            .with_artifact("team_execution_time", team_time))
    }
}

fn team_outcome(response: &AgentResponse) -> Map<String, Value> {
    let mut outcome = response.outcome.clone();
    if !response.member_runs.is_empty() {
        outcome.insert("agents_involved".to_string(), json!(response.member_runs));
    }

    outcome.insert("deliverable_generated".to_string(), json!(!response.content.is_empty()));
    let content = response.content.to_lowercase();
    for (marker, key) in [
        ("summary", "summary_included"),
        ("analysis", "analysis_included"),
        ("recommendation", "recommendations_included"),
    ] {
        if content.contains(marker) {
            outcome.insert(key.to_string(), Value::Bool(true));
        }
    }
    outcome
}

fn string_list(expected: &Map<String, Value>, key: &str) -> Vec<String> {
    expected
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Half the score for member overlap, half for expected sections present.
fn collaboration_effectiveness(
    response: &AgentResponse,
    expected: &Map<String, Value>,
    threshold: f64,
) -> MetricResult {
    let mut score = 0.0;
    let mut result_details = Map::new();

    let expected_agents: HashSet<String> = string_list(expected, "agents_involved").into_iter().collect();
    if !expected_agents.is_empty() {
        let actual: HashSet<&String> = response.member_runs.iter().collect();
        let overlap = expected_agents.iter().filter(|a| actual.contains(a)).count();
        let ratio = overlap as f64 / expected_agents.len() as f64;
        score += ratio * 0.5;
        result_details.insert("agent_overlap".to_string(), json!(ratio));
    }

    let sections = string_list(expected, "sections");
    if !sections.is_empty() {
        let content = response.content.to_lowercase();
        let found = sections.iter().filter(|s| content.contains(&s.to_lowercase())).count();
        let ratio = found as f64 / sections.len() as f64;
        score += ratio * 0.5;
        result_details.insert("sections_found".to_string(), json!(found));
        result_details.insert("sections_expected".to_string(), json!(sections.len()));
    }

    MetricResult::new(MetricName::CollaborationEffectiveness, f64::min(score, 1.0), threshold)
        .with_details(result_details)
}

#[async_trait]
impl TestCase for TeamOrchestrationTest {
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
