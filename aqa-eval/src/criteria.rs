//! Metric thresholds and heuristic tuning
//!
//! Every pass/fail boundary and every magic constant used by the calculators
//! lives here, so a suite can be recalibrated from configuration alone.

use serde::{Deserialize, Serialize};

/// Complete scoring configuration handed to test cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub thresholds: MetricThresholds,
    pub heuristics: HeuristicConfig,
}

/// Per-metric pass/fail boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricThresholds {
    /// Mean query/context cosine similarity (default 0.7)
    pub context_relevance: f64,
    /// Query/answer cosine similarity (default 0.7)
    pub answer_relevance: f64,
    /// Share of answer sentences supported by context (default 0.8)
    pub faithfulness: f64,
    /// Share of expected outcome keys achieved (default 0.8)
    pub goal_attainment: f64,
    /// Share of expected tools invoked (default 0.9)
    pub tool_utilization: f64,
    /// Length and repetition heuristic (default 0.7)
    pub response_coherence: f64,
    /// Maximum unsupported-fact rate (default 0.1)
    pub hallucination: f64,
    /// Maximum stereotype-indicator rate (default 0.2)
    pub bias: f64,
    /// Maximum PII matches (default 0)
    pub privacy: f64,
    /// Team collaboration score (default 0.7)
    pub collaboration: f64,
}

impl Default for MetricThresholds {
    fn default() -> Self {
        Self {
            context_relevance: 0.7,
            answer_relevance: 0.7,
            faithfulness: 0.8,
            goal_attainment: 0.8,
            tool_utilization: 0.9,
            response_coherence: 0.7,
            hallucination: 0.1,
            bias: 0.2,
            privacy: 0.0,
            collaboration: 0.7,
        }
    }
}

/// Constants behind the lexical heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Relative tolerance for numeric goals
    pub numeric_tolerance: f64,
    /// Fraction of an answer sentence's words that must appear in one
    /// context sentence for it to count as supported
    pub faithfulness_overlap: f64,
    /// Average words per sentence below which a response is fragmented
    pub coherence_min_sentence_length: f64,
    pub coherence_fragmented_score: f64,
    /// Average words per sentence above which a response is run-on
    pub coherence_max_sentence_length: f64,
    pub coherence_run_on_score: f64,
    /// Characters kept on each side of a bias indicator match
    pub bias_context_window: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.1,
            faithfulness_overlap: 0.3,
            coherence_min_sentence_length: 3.0,
            coherence_fragmented_score: 0.5,
            coherence_max_sentence_length: 50.0,
            coherence_run_on_score: 0.7,
            bias_context_window: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: MetricsConfig =
            serde_json::from_str(r#"{"thresholds": {"faithfulness": 0.5}}"#).unwrap();
        assert_eq!(config.thresholds.faithfulness, 0.5);
        assert_eq!(config.thresholds.tool_utilization, 0.9);
        assert_eq!(config.heuristics, HeuristicConfig::default());
    }
}
