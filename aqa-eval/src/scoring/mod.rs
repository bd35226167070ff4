//! Metric calculators
//!
//! Cheap lexical and statistical heuristics over already-materialised text.
//! Calculators never return errors: anything that goes wrong inside one is
//! reported as a failed [`MetricResult`](crate::metric::MetricResult) whose
//! `details.error` carries the message.

pub mod agent;
pub mod quality;
pub mod rag;
pub(crate) mod text;

pub use agent::AgentMetrics;
pub use quality::{BIAS_INDICATORS, DEFAULT_PROTECTED_ATTRIBUTES, QualityMetrics};
pub use rag::RagMetrics;
