//! Test cases
//!
//! A test case binds one collaborator (agent, team or scenario framework) to
//! one fixture and a set of metric calculators, and produces exactly one
//! [`TestResult`]. Failures of the collaborator are turned into a failed
//! result with `error_message` set; they are never returned as `Err`.

mod behavior;
mod performance;
mod rag;
mod safety;
mod scenario;
mod system;
mod team;

pub use behavior::AgentBehaviorTest;
pub use performance::{LatencyTest, ThroughputTest};
pub use rag::RagValidationTest;
pub use safety::QualitySafetyTest;
pub use scenario::{ScenarioOutcome, ScenarioRunner, ScenarioTest};
pub use system::{ExpectedOutcomes, ScenarioStep, StepTarget, SystemIntegrationTest, SystemScenario};
pub use team::TeamOrchestrationTest;

use crate::error::{EvalError, Result};
use crate::metric::MetricSet;
use crate::report::{TestCategory, TestResult, TestSeverity};
use aqa_core::{Agent, AgentResponse, RunOptions};
use aqa_telemetry::agent_call_span;
use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

/// A single executable test
#[async_trait]
pub trait TestCase: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> TestCategory;

    fn severity(&self) -> TestSeverity;

    /// Called before `run`
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self) -> Result<TestResult>;

    /// Called after `run`, even when it failed
    async fn teardown(&self) -> Result<()> {
        Ok(())
    }
}

/// Identity and classification shared by every test case
#[derive(Debug, Clone)]
pub(crate) struct TestInfo {
    pub name: String,
    pub category: TestCategory,
    pub severity: TestSeverity,
}

impl TestInfo {
    pub fn new(name: impl Into<String>, category: TestCategory, severity: TestSeverity) -> Self {
        Self { name: name.into(), category, severity }
    }

    pub fn scored(&self, metrics: MetricSet, score: f64, threshold: f64) -> TestResult {
        TestResult::from_metrics(&self.name, self.category, self.severity, metrics, score, threshold)
    }

    /// Stamp the elapsed time on an evaluation, converting errors into a failed result.
    pub fn finish(&self, outcome: Result<TestResult>, start: Instant) -> TestResult {
        let elapsed = start.elapsed().as_secs_f64();
        match outcome {
            Ok(result) => result.with_execution_time(elapsed),
            Err(e) => {
                tracing::warn!(test.name = %self.name, error = %e, "test case failed to evaluate");
                TestResult::error(&self.name, self.category, self.severity, e.to_string())
                    .with_execution_time(elapsed)
            }
        }
    }
}

/// Run an agent, returning its response and the seconds it took.
pub(crate) async fn invoke_agent(
    agent: &dyn Agent,
    message: &str,
    options: &RunOptions,
) -> Result<(AgentResponse, f64)> {
    let start = Instant::now();
    let outcome = agent.run(message, options).instrument(agent_call_span(agent.name())).await;
    let elapsed = start.elapsed().as_secs_f64();

    outcome.map(|response| (response, elapsed)).map_err(|e| {
        EvalError::AgentError(format!("Agent execution failed after {:.2}s: {}", elapsed, e))
    })
}
