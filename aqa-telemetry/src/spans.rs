//! Span helpers for harness operations
//!
//! Pre-configured spans for suite runs, test cases, agent calls and metric
//! calculations.

use tracing::Span;

/// Create a span covering one runner invocation
///
/// # Example
/// ```
/// use aqa_telemetry::suite_run_span;
/// let span = suite_run_span("run-123", 12);
/// let _enter = span.enter();
/// ```
pub fn suite_run_span(run_id: &str, test_count: usize) -> Span {
    tracing::info_span!("suite.run", run.id = run_id, suite.tests = test_count)
}

/// Create a span for one test case execution
///
/// # Arguments
/// * `test_name` - Name of the test case
/// * `category` - Test category (e.g. `rag_core`)
/// * `severity` - Severity tier (e.g. `critical`)
pub fn test_case_span(test_name: &str, category: &str, severity: &str) -> Span {
    tracing::info_span!(
        "test.case",
        test.name = test_name,
        test.category = category,
        test.severity = severity,
    )
}

/// Create a span for a call into an external agent or team
pub fn agent_call_span(agent_name: &str) -> Span {
    tracing::info_span!("agent.call", agent.name = agent_name)
}

/// Create a span for a metric calculation
pub fn metric_span(metric_name: &str) -> Span {
    tracing::debug_span!("metric.calculate", metric.name = metric_name)
}
