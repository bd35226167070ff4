//! Retrieval-augmented generation metrics

use super::text::{sentences, word_set};
use crate::criteria::HeuristicConfig;
use crate::embedding::{EmbeddingProvider, HashingEmbedder, cosine_similarity};
use crate::error::Result;
use crate::metric::{MetricName, MetricResult};
use aqa_telemetry::metric_span;
use serde_json::json;
use std::sync::Arc;

/// Context relevance, answer relevance and faithfulness
#[derive(Clone)]
pub struct RagMetrics {
    embedder: Arc<dyn EmbeddingProvider>,
    heuristics: HeuristicConfig,
}

impl RagMetrics {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, heuristics: HeuristicConfig::default() }
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicConfig) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Mean cosine similarity between the query and each retrieved context.
    pub fn context_relevance(&self, query: &str, contexts: &[String], threshold: f64) -> MetricResult {
        let _span = metric_span(MetricName::ContextRelevance.as_str()).entered();

        if contexts.is_empty() {
            return MetricResult::failure(
                MetricName::ContextRelevance,
                threshold,
                "No contexts provided",
            );
        }

        match self.similarities(query, contexts) {
            Ok(similarities) => {
                let mean = similarities.iter().sum::<f64>() / similarities.len() as f64;
                let max = similarities.iter().copied().fold(f64::MIN, f64::max);
                let min = similarities.iter().copied().fold(f64::MAX, f64::min);

                MetricResult::new(MetricName::ContextRelevance, mean, threshold)
                    .with_detail("individual_similarities", json!(similarities))
                    .with_detail("max_similarity", max)
                    .with_detail("min_similarity", min)
                    .with_detail("num_contexts", contexts.len())
            }
            Err(e) => MetricResult::failure(MetricName::ContextRelevance, threshold, e.to_string()),
        }
    }

    /// Cosine similarity between the query and the answer.
    pub fn answer_relevance(&self, query: &str, answer: &str, threshold: f64) -> MetricResult {
        let _span = metric_span(MetricName::AnswerRelevance.as_str()).entered();

        let similarity = self
            .embedder
            .embed(query)
            .and_then(|q| self.embedder.embed(answer).and_then(|a| cosine_similarity(&q, &a)));

        match similarity {
            Ok(similarity) => MetricResult::new(MetricName::AnswerRelevance, similarity, threshold)
                .with_detail("query_length", query.chars().count())
                .with_detail("answer_length", answer.chars().count())
                .with_detail("similarity_score", similarity),
            Err(e) => MetricResult::failure(MetricName::AnswerRelevance, threshold, e.to_string()),
        }
    }

    /// Share of answer sentences with word overlap against some context sentence.
    pub fn faithfulness(&self, context: &str, answer: &str, threshold: f64) -> MetricResult {
        let _span = metric_span(MetricName::Faithfulness.as_str()).entered();

        let context = context.to_lowercase();
        let answer = answer.to_lowercase();
        let context_words: Vec<_> = sentences(&context).into_iter().map(word_set).collect();
        let answer_sentences = sentences(&answer);

        if answer_sentences.is_empty() {
            return MetricResult::failure(MetricName::Faithfulness, threshold, "Empty answer");
        }

        let overlap = self.heuristics.faithfulness_overlap;
        let supported = answer_sentences
            .iter()
            .filter(|sentence| {
                let words = word_set(sentence);
                let required = words.len() as f64 * overlap;
                context_words.iter().any(|ctx| words.intersection(ctx).count() as f64 > required)
            })
            .count();

        let ratio = supported as f64 / answer_sentences.len() as f64;
        MetricResult::new(MetricName::Faithfulness, ratio, threshold)
            .with_detail("answer_sentences", answer_sentences.len())
            .with_detail("supported_sentences", supported)
            .with_detail("support_ratio", ratio)
    }

    fn similarities(&self, query: &str, contexts: &[String]) -> Result<Vec<f64>> {
        let query = self.embedder.embed(query)?;
        self.embedder
            .embed_batch(contexts)?
            .iter()
            .map(|context| cosine_similarity(&query, context))
            .collect()
    }
}

impl Default for RagMetrics {
    fn default() -> Self {
        Self::new(Arc::new(HashingEmbedder::default()))
    }
}
