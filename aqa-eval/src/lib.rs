//! # aqa-eval
//!
//! Scoring engine and CI pipeline for the agent quality-assurance harness.
//!
//! ## Overview
//!
//! - **Metric calculators**: deterministic lexical and embedding heuristics
//!   over agent transcripts ([`RagMetrics`], [`AgentMetrics`], [`QualityMetrics`])
//! - **Test cases**: bind one agent or team to one fixture ([`TestCase`])
//! - **Runner**: ordered execution with crash and timeout isolation ([`TestRunner`])
//! - **CI gates**: build status and exit code from a run ([`CiRunner`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aqa_eval::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let agent: Arc<dyn Agent> = create_my_agent();
//!
//!     let tests: Vec<Arc<dyn TestCase>> = TestDataFactory::rag()
//!         .into_iter()
//!         .map(|data| Arc::new(RagValidationTest::new(agent.clone(), data)) as Arc<dyn TestCase>)
//!         .collect();
//!
//!     let ci = CiRunner::new(TestRunner::default(), CiConfig::default());
//!     let report = ci.run_ci_tests(&tests).await?;
//!     println!("{}", report.format_summary());
//!     std::process::exit(report.exit_code);
//! }
//! ```

pub mod adapter;
pub mod case;
pub mod ci;
pub mod criteria;
pub mod embedding;
pub mod error;
pub mod fixtures;
pub mod metric;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod storage;

// Re-exports
pub use adapter::{AgentAdapter, AgentInput, FormattedMessage, ScenarioAdapter, format_messages};
pub use case::{
    AgentBehaviorTest, ExpectedOutcomes, LatencyTest, QualitySafetyTest, RagValidationTest,
    ScenarioOutcome, ScenarioRunner, ScenarioStep, ScenarioTest, StepTarget, SystemIntegrationTest,
    SystemScenario, TeamOrchestrationTest, TestCase, ThroughputTest,
};
pub use ci::{BuildStatus, CiConfig, CiReport, CiRunner, QualityGate};
pub use criteria::{HeuristicConfig, MetricThresholds, MetricsConfig};
pub use embedding::{EmbeddingProvider, HashingEmbedder, cosine_similarity};
pub use error::{EvalError, Result};
pub use fixtures::{GoldenDataset, TestData, TestDataFactory, default_golden_datasets, save_default_datasets};
pub use metric::{Direction, MetricName, MetricResult, MetricSet};
pub use report::{AggregateMetrics, RunReport, RunSummary, TestCategory, TestResult, TestSeverity};
pub use runner::{RunnerConfig, TestFilter, TestRunner};
pub use scoring::{AgentMetrics, QualityMetrics, RagMetrics};
pub use storage::ResultStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::case::{
        AgentBehaviorTest, QualitySafetyTest, RagValidationTest, TeamOrchestrationTest, TestCase,
    };
    pub use crate::ci::{CiConfig, CiReport, CiRunner};
    pub use crate::error::{EvalError, Result};
    pub use crate::fixtures::{GoldenDataset, TestData, TestDataFactory};
    pub use crate::metric::{MetricName, MetricResult};
    pub use crate::report::{RunReport, TestCategory, TestResult, TestSeverity};
    pub use crate::runner::{RunnerConfig, TestFilter, TestRunner};
    pub use aqa_core::{Agent, AgentResponse, ToolCall};
}
