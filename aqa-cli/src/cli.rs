use aqa_eval::TestSeverity;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Agent quality-assurance runner
#[derive(Parser, Debug)]
#[command(name = "aqa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suite to run
    #[arg(short = 't', long, value_enum, default_value_t = TestType::Ci)]
    pub test_type: TestType,

    /// Only run tests of these severities (space or comma separated)
    #[arg(short, long, value_enum, num_args = 0.., value_delimiter = ',')]
    pub severity: Vec<SeverityArg>,

    /// Stop on the first failing test
    #[arg(long)]
    pub fail_fast: bool,

    /// Directory for results, reports and logs
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write the default golden datasets to `<output-dir>/datasets` first
    #[arg(long)]
    pub generate_datasets: bool,

    /// TOML configuration file (defaults to ./aqa.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestType {
    /// Golden datasets through the CI quality gates
    Ci,
    /// RAG, behavior and safety tests against the sage agent
    Sage,
    /// Team orchestration tests
    Teams,
    /// End-to-end integration scenarios
    System,
    /// Latency and throughput tests
    Performance,
    /// Every suite except ci
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Critical,
    High,
    Medium,
    Low,
}

impl From<SeverityArg> for TestSeverity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Critical => TestSeverity::Critical,
            SeverityArg::High => TestSeverity::High,
            SeverityArg::Medium => TestSeverity::Medium,
            SeverityArg::Low => TestSeverity::Low,
        }
    }
}

impl Cli {
    /// Severity filter from the command line, `None` when no flag was given.
    pub fn severities(&self) -> Option<Vec<TestSeverity>> {
        (!self.severity.is_empty()).then(|| self.severity.iter().copied().map(Into::into).collect())
    }
}
