//! Suite assembly
//!
//! Each suite binds the configured agents and teams to fixtures and runs them
//! through a [`TestRunner`] writing under its own output subdirectory.

use crate::config::HarnessConfig;
use anyhow::Result;
use aqa_core::{Agent, HttpAgent};
use aqa_eval::{
    AgentBehaviorTest, CiConfig, CiReport, CiRunner, ExpectedOutcomes, LatencyTest, MetricsConfig,
    QualitySafetyTest, RagValidationTest, RunReport, RunnerConfig, ScenarioStep,
    SystemIntegrationTest, SystemScenario, TeamOrchestrationTest, TestCase, TestData,
    TestDataFactory, TestFilter, TestRunner, TestSeverity, ThroughputTest, default_golden_datasets,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub const SAGE: &str = "sage";
pub const SCHOLAR: &str = "scholar";
pub const FINANCE_TEAM: &str = "finance_researcher";
pub const LANGUAGE_TEAM: &str = "multi_language";

/// The agents and teams under test
pub struct Collaborators {
    pub sage: Arc<dyn Agent>,
    pub scholar: Arc<dyn Agent>,
    pub finance_team: Arc<dyn Agent>,
    pub language_team: Arc<dyn Agent>,
}

impl Collaborators {
    /// Connect to every collaborator over HTTP.
    pub fn connect(config: &HarnessConfig) -> Result<Self> {
        let connect = |name: &str| -> Result<Arc<dyn Agent>> {
            let endpoint = config.endpoint(name);
            let agent = HttpAgent::new(name, endpoint.endpoint.clone(), endpoint.timeout()?)?;
            Ok(Arc::new(agent))
        };

        Ok(Self {
            sage: connect(SAGE)?,
            scholar: connect(SCHOLAR)?,
            finance_team: connect(FINANCE_TEAM)?,
            language_team: connect(LANGUAGE_TEAM)?,
        })
    }

    fn agents(&self) -> Vec<Arc<dyn Agent>> {
        vec![self.sage.clone(), self.scholar.clone()]
    }

    fn teams(&self) -> Vec<Arc<dyn Agent>> {
        vec![self.finance_team.clone(), self.language_team.clone()]
    }

    fn team_for(&self, data: &TestData) -> Option<Arc<dyn Agent>> {
        match data.metadata_str("domain", "") {
            "finance" => Some(self.finance_team.clone()),
            "language" => Some(self.language_team.clone()),
            _ => None,
        }
    }
}

/// Options shared by every non-CI suite
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub runner: RunnerConfig,
    pub filter: TestFilter,
    pub fail_fast: bool,
}

impl SuiteOptions {
    async fn run(&self, suite: &str, tests: Vec<Arc<dyn TestCase>>) -> Result<RunReport> {
        let output_dir: PathBuf = self.runner.output_dir.join(suite);
        let runner = TestRunner::new(self.runner.clone().with_output_dir(output_dir));
        let report = runner.run_tests(&tests, &self.filter, self.fail_fast).await?;

        println!("{}", report.format_summary());
        println!(
            "{} tests completed: {}/{} passed",
            suite, report.summary.passed, report.summary.total_tests
        );
        Ok(report)
    }
}

fn boxed<T: TestCase + 'static>(test: T) -> Arc<dyn TestCase> {
    Arc::new(test)
}

pub fn sage_tests(c: &Collaborators, metrics: &MetricsConfig) -> Vec<Arc<dyn TestCase>> {
    let mut tests = Vec::new();
    for data in TestDataFactory::rag() {
        tests.push(boxed(RagValidationTest::new(c.sage.clone(), data).with_config(metrics)));
    }
    for data in TestDataFactory::agent_behavior() {
        tests.push(boxed(AgentBehaviorTest::new(c.sage.clone(), data).with_config(metrics)));
    }
    for data in TestDataFactory::quality_safety() {
        tests.push(boxed(QualitySafetyTest::new(c.sage.clone(), data).with_config(metrics)));
    }
    tests
}

pub fn team_tests(c: &Collaborators, metrics: &MetricsConfig) -> Vec<Arc<dyn TestCase>> {
    TestDataFactory::team_orchestration()
        .into_iter()
        .filter_map(|data| {
            let team = c.team_for(&data)?;
            Some(boxed(TeamOrchestrationTest::new(team, data).with_config(metrics)))
        })
        .collect()
}

pub fn system_scenarios() -> Vec<SystemScenario> {
    vec![
        SystemScenario {
            name: "research_and_report".to_string(),
            description: "Research a topic and generate a comprehensive report".to_string(),
            steps: vec![
                ScenarioStep::agent(SAGE, "Research the latest developments in artificial intelligence")
                    .with_name("research_step"),
                ScenarioStep::team(FINANCE_TEAM, "Generate a financial impact analysis of AI developments")
                    .with_name("analysis_step"),
            ],
            expected_outcomes: ExpectedOutcomes {
                max_execution_time: Some(120.0),
                deliverables: vec!["research_summary".to_string(), "financial_analysis".to_string()],
            },
        },
        SystemScenario {
            name: "multilingual_processing".to_string(),
            description: "Process content in multiple languages".to_string(),
            steps: vec![
                ScenarioStep::agent(SCHOLAR, "Analyze this text for key insights: [sample text]")
                    .with_name("analysis_step"),
                ScenarioStep::team(LANGUAGE_TEAM, "Translate the analysis to Spanish and French")
                    .with_name("translation_step"),
            ],
            expected_outcomes: ExpectedOutcomes {
                max_execution_time: Some(90.0),
                deliverables: vec![
                    "analysis".to_string(),
                    "spanish_translation".to_string(),
                    "french_translation".to_string(),
                ],
            },
        },
    ]
}

pub fn system_tests(c: &Collaborators) -> Vec<Arc<dyn TestCase>> {
    system_scenarios()
        .into_iter()
        .map(|scenario| boxed(SystemIntegrationTest::new(scenario, c.agents(), c.teams())))
        .collect()
}

pub fn performance_tests(c: &Collaborators) -> Vec<Arc<dyn TestCase>> {
    let mut fixtures = TestDataFactory::performance().into_iter();
    let latency = fixtures.next();
    let throughput = fixtures.next();

    let mut tests = Vec::new();
    if let Some(latency) = latency {
        for i in 1..=5 {
            let mut data = latency.clone();
            data.input_data
                .insert("query".to_string(), Value::String(format!("Performance test query {}", i)));
            tests.push(boxed(
                LatencyTest::new(c.sage.clone(), data).with_name(format!("Performance_latency_{}", i)),
            ));
        }
    }
    if let Some(throughput) = throughput {
        tests.push(boxed(ThroughputTest::new(c.sage.clone(), throughput)));
    }
    tests
}

/// Golden datasets with RAG and safety promoted to critical, behavior run
/// against both agents, and one core integration scenario.
pub fn ci_tests(c: &Collaborators, metrics: &MetricsConfig) -> Vec<Arc<dyn TestCase>> {
    let mut datasets = default_golden_datasets();
    let mut take = |name: &str| datasets.remove(name).map(|d| d.test_cases).unwrap_or_default();
    let mut tests = Vec::new();

    for data in take("rag_validation") {
        tests.push(boxed(
            RagValidationTest::new(c.sage.clone(), data)
                .with_config(metrics)
                .with_severity(TestSeverity::Critical),
        ));
    }
    for data in take("quality_safety") {
        tests.push(boxed(
            QualitySafetyTest::new(c.sage.clone(), data)
                .with_config(metrics)
                .with_severity(TestSeverity::Critical),
        ));
    }
    for data in take("agent_behavior") {
        for agent in [&c.sage, &c.scholar] {
            let name = format!(
                "Agent_Behavior_{}_{}",
                data.metadata_str("scenario", "general"),
                agent.name()
            );
            tests.push(boxed(
                AgentBehaviorTest::new(agent.clone(), data.clone())
                    .with_name(name)
                    .with_config(metrics),
            ));
        }
    }
    for data in take("team_orchestration") {
        if let Some(team) = c.team_for(&data) {
            tests.push(boxed(TeamOrchestrationTest::new(team, data).with_config(metrics)));
        }
    }

    let core = SystemScenario {
        name: "core_functionality".to_string(),
        description: "Test core system functionality".to_string(),
        steps: vec![ScenarioStep::agent(SAGE, "What is machine learning?").with_name("knowledge_query")],
        expected_outcomes: ExpectedOutcomes { max_execution_time: Some(30.0), deliverables: Vec::new() },
    };
    tests.push(boxed(SystemIntegrationTest::new(core, c.agents(), c.teams())));
    tests
}

pub async fn run_ci(
    c: &Collaborators,
    runner: RunnerConfig,
    ci: CiConfig,
    metrics: &MetricsConfig,
) -> Result<CiReport> {
    let output_dir = runner.output_dir.join("ci");
    let ci_runner = CiRunner::new(TestRunner::new(runner.with_output_dir(output_dir)), ci);
    let report = ci_runner.run_ci_tests(&ci_tests(c, metrics)).await?;

    println!("{}", report.format_summary());
    if report.passed() {
        println!("CI test suite PASSED - ready for deployment");
    } else {
        println!("CI test suite FAILED - review issues before deployment");
    }
    Ok(report)
}

pub async fn run_sage(c: &Collaborators, options: &SuiteOptions, metrics: &MetricsConfig) -> Result<RunReport> {
    options.run("sage", sage_tests(c, metrics)).await
}

pub async fn run_teams(c: &Collaborators, options: &SuiteOptions, metrics: &MetricsConfig) -> Result<RunReport> {
    options.run("teams", team_tests(c, metrics)).await
}

pub async fn run_system(c: &Collaborators, options: &SuiteOptions) -> Result<RunReport> {
    options.run("system", system_tests(c)).await
}

pub async fn run_performance(c: &Collaborators, options: &SuiteOptions) -> Result<RunReport> {
    let report = options.run("performance", performance_tests(c)).await?;
    let performance = &report.metrics.performance;
    println!("Average Execution Time: {:.2}s", performance.avg_execution_time);
    println!("Total Execution Time: {:.2}s", performance.total_execution_time);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqa_eval::TestCategory;

    fn collaborators() -> Collaborators {
        Collaborators::connect(&HarnessConfig::default()).unwrap()
    }

    #[test]
    fn test_ci_suite_shape() {
        let tests = ci_tests(&collaborators(), &MetricsConfig::default());
        let critical = tests.iter().filter(|t| t.severity() == TestSeverity::Critical).count();

        // 2 RAG + 3 safety + 1 system are critical; 2 behavior x 2 agents + 2 team are high.
        assert_eq!(critical, 6);
        assert_eq!(tests.len(), 12);
        assert_eq!(tests.last().unwrap().name(), "System_Integration_core_functionality");
    }

    #[test]
    fn test_ci_behavior_names_identify_the_agent() {
        let tests = ci_tests(&collaborators(), &MetricsConfig::default());
        let behavior: Vec<&str> = tests
            .iter()
            .filter(|t| t.category() == TestCategory::AgentBehavior)
            .map(|t| t.name())
            .collect();

        assert_eq!(behavior.len(), 4);
        assert!(behavior.contains(&"Agent_Behavior_simple_booking_sage"));
        assert!(behavior.contains(&"Agent_Behavior_simple_booking_scholar"));
        let unique: std::collections::HashSet<&str> = tests.iter().map(|t| t.name()).collect();
        assert_eq!(unique.len(), tests.len());
    }

    #[test]
    fn test_performance_suite_shape() {
        let tests = performance_tests(&collaborators());
        assert_eq!(tests.len(), 6);
        assert_eq!(tests[0].name(), "Performance_latency_1");
        assert_eq!(tests[5].name(), "Performance_throughput");
    }

    #[test]
    fn test_teams_are_routed_by_domain() {
        let tests = team_tests(&collaborators(), &MetricsConfig::default());
        let names: Vec<&str> = tests.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            ["Team_Orchestration_multi_agent_collaboration", "Team_Orchestration_sequential_processing"]
        );
    }
}
