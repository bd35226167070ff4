//! Agent behaviour metrics

use super::text::sentences;
use crate::criteria::HeuristicConfig;
use crate::metric::{MetricName, MetricResult};
use aqa_core::ToolCall;
use aqa_telemetry::metric_span;
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashSet};

/// Goal attainment, tool utilisation and response coherence
#[derive(Debug, Clone, Default)]
pub struct AgentMetrics {
    heuristics: HeuristicConfig,
}

impl AgentMetrics {
    pub fn new(heuristics: HeuristicConfig) -> Self {
        Self { heuristics }
    }

    /// Share of expected outcome keys matched by the actual outcome.
    ///
    /// Booleans compare by equality, numbers within the configured relative
    /// tolerance, strings by case-insensitive containment and anything else
    /// exactly. A key that is missing (or `null`) in `actual` is not achieved.
    pub fn goal_attainment(
        &self,
        expected: &Map<String, Value>,
        actual: &Map<String, Value>,
        threshold: f64,
    ) -> MetricResult {
        let _span = metric_span(MetricName::GoalAttainment.as_str()).entered();

        if expected.is_empty() || actual.is_empty() {
            return MetricResult::failure(
                MetricName::GoalAttainment,
                threshold,
                "Missing expected or actual outcome",
            );
        }

        let mut breakdown = Map::new();
        let mut achieved_goals = 0usize;
        for (key, expected_value) in expected {
            let actual_value = actual.get(key).filter(|v| !v.is_null());
            let achieved = actual_value
                .is_some_and(|actual| self.goal_achieved(expected_value, actual));
            if achieved {
                achieved_goals += 1;
            }
            breakdown.insert(
                key.clone(),
                json!({
                    "expected": expected_value,
                    "actual": actual_value.cloned().unwrap_or(Value::Null),
                    "present": actual_value.is_some(),
                    "achieved": achieved,
                }),
            );
        }

        let rate = achieved_goals as f64 / expected.len() as f64;
        MetricResult::new(MetricName::GoalAttainment, rate, threshold)
            .with_detail("goal_breakdown", breakdown)
            .with_detail("total_goals", expected.len())
            .with_detail("achieved_goals", achieved_goals)
            .with_detail("attainment_rate", rate)
    }

    fn goal_achieved(&self, expected: &Value, actual: &Value) -> bool {
        match (expected, actual) {
            (Value::Bool(expected), actual) => actual.as_bool() == Some(*expected),
            (Value::Number(expected), Value::Number(actual)) => {
                match (expected.as_f64(), actual.as_f64()) {
                    (Some(e), Some(a)) => (a - e).abs() <= (e * self.heuristics.numeric_tolerance).abs(),
                    _ => false,
                }
            }
            (Value::String(expected), Value::String(actual)) => {
                actual.to_lowercase().contains(&expected.to_lowercase())
            }
            (Value::Number(_) | Value::String(_), _) => false,
            (expected, actual) => expected == actual,
        }
    }

    /// Share of expected tools that appear among the actual tool calls.
    pub fn tool_utilization(
        &self,
        expected_tools: &[String],
        actual_tool_calls: &[ToolCall],
        threshold: f64,
    ) -> MetricResult {
        let _span = metric_span(MetricName::ToolUtilization.as_str()).entered();

        if expected_tools.is_empty() {
            return MetricResult::new(MetricName::ToolUtilization, 1.0, threshold)
                .with_detail("note", "No tools expected");
        }

        let expected: BTreeSet<&str> = expected_tools.iter().map(String::as_str).collect();
        let actual: BTreeSet<&str> = actual_tool_calls.iter().map(|c| c.tool_name.as_str()).collect();

        let correctly_used = expected.intersection(&actual).count();
        let accuracy = correctly_used as f64 / expected.len() as f64;

        MetricResult::new(MetricName::ToolUtilization, accuracy, threshold)
            .with_detail("expected_tools", json!(expected))
            .with_detail("actual_tools", json!(actual))
            .with_detail("correctly_used", correctly_used)
            .with_detail("total_expected", expected.len())
            .with_detail("missing_tools", json!(expected.difference(&actual).collect::<Vec<_>>()))
            .with_detail("unexpected_tools", json!(actual.difference(&expected).collect::<Vec<_>>()))
    }

    /// Mean of a sentence-length score and a repetition score.
    pub fn response_coherence(&self, text: &str, threshold: f64) -> MetricResult {
        let _span = metric_span(MetricName::ResponseCoherence.as_str()).entered();

        if text.trim().is_empty() {
            return MetricResult::failure(MetricName::ResponseCoherence, threshold, "Empty response");
        }

        let sentences = sentences(text);
        if sentences.is_empty() {
            return MetricResult::failure(
                MetricName::ResponseCoherence,
                threshold,
                "No sentences found",
            );
        }

        let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
        let avg_sentence_length = total_words as f64 / sentences.len() as f64;

        let h = &self.heuristics;
        let length_score = if avg_sentence_length < h.coherence_min_sentence_length {
            h.coherence_fragmented_score
        } else if avg_sentence_length > h.coherence_max_sentence_length {
            h.coherence_run_on_score
        } else {
            1.0
        };

        let unique: HashSet<&str> = sentences.iter().copied().collect();
        let repetition_score = unique.len() as f64 / sentences.len() as f64;
        let score = (length_score + repetition_score) / 2.0;

        MetricResult::new(MetricName::ResponseCoherence, score, threshold)
            .with_detail("sentence_count", sentences.len())
            .with_detail("avg_sentence_length", avg_sentence_length)
            .with_detail("repetition_score", repetition_score)
            .with_detail("length_score", length_score)
            .with_detail("total_characters", text.chars().count())
    }
}

/// Pull `[{"tool_name": ...}]` out of a JSON outcome, ignoring malformed entries.
pub fn tool_calls_from_outcome(outcome: &Map<String, Value>) -> Vec<ToolCall> {
    outcome
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| serde_json::from_value::<ToolCall>(call.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Expected tool names listed under `tools_used`, if any.
pub fn expected_tools(expected: &Map<String, Value>) -> Option<Vec<String>> {
    expected.get("tools_used").and_then(Value::as_array).map(|tools| {
        tools.iter().filter_map(Value::as_str).map(str::to_string).collect()
    })
}
