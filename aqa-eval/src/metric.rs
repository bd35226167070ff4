//! Metric results
//!
//! Every calculator produces a [`MetricResult`]. Whether a result passed is
//! always derived from its value, its threshold and the metric's
//! [`Direction`]; it cannot be set by hand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which side of the threshold counts as a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Passes when `value >= threshold`
    HigherIsBetter,
    /// Passes when `value <= threshold`
    LowerIsBetter,
}

impl Direction {
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Direction::HigherIsBetter => value >= threshold,
            Direction::LowerIsBetter => value <= threshold,
        }
    }
}

/// Fixed metric vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    ContextRelevance,
    AnswerRelevance,
    Faithfulness,
    GoalAttainment,
    ToolUtilization,
    ResponseCoherence,
    HallucinationDetection,
    BiasDetection,
    PrivacyLeakage,
    CollaborationEffectiveness,
    StepCompletion,
    TimingConstraint,
    ResponseLatency,
    Throughput,
    QuerySuccessRate,
    ScenarioSuccess,
}

impl MetricName {
    pub const ALL: [MetricName; 16] = [
        MetricName::ContextRelevance,
        MetricName::AnswerRelevance,
        MetricName::Faithfulness,
        MetricName::GoalAttainment,
        MetricName::ToolUtilization,
        MetricName::ResponseCoherence,
        MetricName::HallucinationDetection,
        MetricName::BiasDetection,
        MetricName::PrivacyLeakage,
        MetricName::CollaborationEffectiveness,
        MetricName::StepCompletion,
        MetricName::TimingConstraint,
        MetricName::ResponseLatency,
        MetricName::Throughput,
        MetricName::QuerySuccessRate,
        MetricName::ScenarioSuccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ContextRelevance => "context_relevance",
            MetricName::AnswerRelevance => "answer_relevance",
            MetricName::Faithfulness => "faithfulness",
            MetricName::GoalAttainment => "goal_attainment",
            MetricName::ToolUtilization => "tool_utilization",
            MetricName::ResponseCoherence => "response_coherence",
            MetricName::HallucinationDetection => "hallucination_detection",
            MetricName::BiasDetection => "bias_detection",
            MetricName::PrivacyLeakage => "privacy_leakage",
            MetricName::CollaborationEffectiveness => "collaboration_effectiveness",
            MetricName::StepCompletion => "step_completion",
            MetricName::TimingConstraint => "timing_constraint",
            MetricName::ResponseLatency => "response_latency",
            MetricName::Throughput => "throughput",
            MetricName::QuerySuccessRate => "query_success_rate",
            MetricName::ScenarioSuccess => "scenario_success",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            MetricName::HallucinationDetection
            | MetricName::BiasDetection
            | MetricName::PrivacyLeakage
            | MetricName::TimingConstraint
            | MetricName::ResponseLatency => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }

    /// Value recorded when the calculation itself could not be carried out.
    ///
    /// Ratio metrics bottom out at 0.0 or 1.0; counts and durations have no
    /// upper bound, so they report `f64::MAX`.
    pub fn worst_value(&self) -> f64 {
        match self {
            MetricName::HallucinationDetection | MetricName::BiasDetection => 1.0,
            MetricName::PrivacyLeakage
            | MetricName::TimingConstraint
            | MetricName::ResponseLatency => f64::MAX,
            _ => 0.0,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::ALL
            .iter()
            .find(|name| name.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown metric: {}", s))
    }
}

#[derive(Deserialize)]
struct MetricResultRepr {
    name: MetricName,
    value: f64,
    threshold: f64,
    #[serde(default)]
    details: Map<String, Value>,
}

impl From<MetricResultRepr> for MetricResult {
    fn from(repr: MetricResultRepr) -> Self {
        MetricResult::new(repr.name, repr.value, repr.threshold).with_details(repr.details)
    }
}

/// Outcome of one metric calculation
///
/// `passed` is recomputed on deserialization, so a persisted result cannot
/// disagree with its own value and threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetricResultRepr")]
pub struct MetricResult {
    name: MetricName,
    value: f64,
    threshold: f64,
    passed: bool,
    details: Map<String, Value>,
}

impl MetricResult {
    pub fn new(name: MetricName, value: f64, threshold: f64) -> Self {
        let passed = name.direction().passes(value, threshold);
        Self { name, value, threshold, passed, details: Map::new() }
    }

    /// A result for a calculation that could not be carried out.
    pub fn failure(name: MetricName, threshold: f64, error: impl Into<String>) -> Self {
        Self::new(name, name.worst_value(), threshold).with_detail("error", error.into())
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details.extend(details);
        self
    }

    pub fn name(&self) -> MetricName {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(Value::as_str)
    }
}

/// Metrics produced by one test case, keyed by the test's own label
///
/// Labels usually equal the metric name, but a test may record the same
/// metric under a more specific key (e.g. `team_goal_attainment`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, MetricResult>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, result: MetricResult) {
        self.0.insert(key.into(), result);
    }

    /// Record a result under its own metric name.
    pub fn push(&mut self, result: MetricResult) {
        self.0.insert(result.name().as_str().to_string(), result);
    }

    pub fn get(&self, key: &str) -> Option<&MetricResult> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricResult)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Conjunction over every metric, or `None` when nothing was measured.
    pub fn all_passed(&self) -> Option<bool> {
        if self.0.is_empty() { None } else { Some(self.0.values().all(MetricResult::passed)) }
    }

    pub fn mean_value(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().map(MetricResult::value).sum::<f64>() / self.0.len() as f64)
    }

    /// Largest value among lower-is-better metrics.
    pub fn worst_lower_is_better(&self) -> Option<f64> {
        self.0
            .values()
            .filter(|m| m.name().direction() == Direction::LowerIsBetter)
            .map(MetricResult::value)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        let faithfulness = MetricResult::new(MetricName::Faithfulness, 0.8, 0.8);
        assert!(faithfulness.passed());

        let hallucination = MetricResult::new(MetricName::HallucinationDetection, 0.2, 0.1);
        assert!(!hallucination.passed());

        let privacy = MetricResult::new(MetricName::PrivacyLeakage, 0.0, 0.0);
        assert!(privacy.passed());
    }

    #[test]
    fn test_failure_uses_worst_value() {
        let result = MetricResult::failure(MetricName::AnswerRelevance, 0.7, "boom");
        assert_eq!(result.value(), 0.0);
        assert!(!result.passed());
        assert_eq!(result.error(), Some("boom"));

        let result = MetricResult::failure(MetricName::BiasDetection, 0.2, "boom");
        assert_eq!(result.value(), 1.0);
        assert!(!result.passed());

        let result = MetricResult::failure(MetricName::ResponseLatency, 30.0, "boom");
        assert!(!result.passed());
    }

    #[test]
    fn test_details_never_null() {
        let result = MetricResult::new(MetricName::Throughput, 6.0, 5.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["details"], serde_json::json!({}));
        assert_eq!(json["name"], "throughput");
    }

    #[test]
    fn test_deserialize_recomputes_passed() {
        let json = serde_json::json!({
            "name": "faithfulness",
            "value": 0.1,
            "threshold": 0.8,
            "passed": true
        });
        let result: MetricResult = serde_json::from_value(json).unwrap();
        assert!(!result.passed());
        assert!(result.details().is_empty());
    }

    #[test]
    fn test_metric_name_parse() {
        for name in MetricName::ALL {
            assert_eq!(name.as_str().parse::<MetricName>().unwrap(), name);
        }
        assert!("unknown".parse::<MetricName>().is_err());
    }

    #[test]
    fn test_metric_set_aggregates() {
        let mut set = MetricSet::new();
        assert_eq!(set.all_passed(), None);
        assert_eq!(set.mean_value(), None);

        set.push(MetricResult::new(MetricName::HallucinationDetection, 0.0, 0.1));
        set.push(MetricResult::new(MetricName::BiasDetection, 0.25, 0.2));
        set.insert("team_goal_attainment", MetricResult::new(MetricName::GoalAttainment, 1.0, 0.8));

        assert_eq!(set.all_passed(), Some(false));
        assert_eq!(set.worst_lower_is_better(), Some(0.25));
        assert!((set.mean_value().unwrap() - 1.25 / 3.0).abs() < 1e-9);
        assert!(set.get("team_goal_attainment").is_some());
    }
}
