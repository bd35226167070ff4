//! Text embeddings for relevance metrics
//!
//! Relevance metrics gate CI builds, so the default provider is a
//! deterministic feature-hashing embedder with no model download or network
//! call. Anything implementing [`EmbeddingProvider`] can replace it.

use crate::error::{EvalError, Result};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Maps text into a vector space where cosine similarity means relatedness
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string
    fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// Embed a batch of texts
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Bag-of-words embedder using the hashing trick
///
/// Tokens are lowercased alphanumeric runs. Each token is hashed with
/// xxHash64 (seed 0) into one of `dimensions` buckets; the resulting count
/// vector is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let mut vector = vec![0.0; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            vector[self.bucket(token)] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}

/// Cosine similarity in [-1, 1]; zero vectors score 0.0
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EvalError::ScoringError(format!(
            "Embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a < 1e-9 || norm_b < 1e-9 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_is_maximally_similar() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("What is machine learning?").unwrap();
        let b = embedder.embed("what is MACHINE learning").unwrap();
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_beats_disjoint() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("capital of France").unwrap();
        let related = embedder.embed("Paris is the capital of France").unwrap();
        let unrelated = embedder.embed("bananas grow in tropical climates").unwrap();

        let related_score = cosine_similarity(&query, &related).unwrap();
        let unrelated_score = cosine_similarity(&query, &unrelated).unwrap();
        assert!(related_score > unrelated_score);
        assert!(related_score > 0.5);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let embedder = HashingEmbedder::new(16);
        let empty = embedder.embed("   ").unwrap();
        let other = embedder.embed("anything").unwrap();
        assert_eq!(cosine_similarity(&empty, &other).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0]).is_err());
    }

    #[test]
    fn test_buckets_are_stable_across_instances() {
        let a = HashingEmbedder::new(64);
        let b = HashingEmbedder::new(64);
        for token in ["paris", "capital", "france", "42"] {
            assert_eq!(a.bucket(token), b.bucket(token));
            assert!(a.bucket(token) < 64);
        }
        assert_eq!(a.embed("Paris, France").unwrap(), b.embed("paris france").unwrap());
    }

    #[test]
    fn test_batch() {
        let embedder = HashingEmbedder::new(8);
        let batch = embedder.embed_batch(&["a b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|v| v.len() == 8));
    }
}
