//! aqa - agent quality-assurance runner
//!
//! ## Usage
//!
//! ```bash
//! # Gate a build on the golden datasets
//! aqa --test-type ci
//!
//! # Run the sage suite, critical and high tests only, stopping on first failure
//! aqa --test-type sage --severity critical high --fail-fast
//! ```
//!
//! The process exits with 0 only when the selected suite passed.

mod cli;
mod config;
mod suites;

use anyhow::{Result, anyhow};
use aqa_eval::{TestFilter, save_default_datasets};
use clap::Parser;
use cli::{Cli, TestType};
use config::HarnessConfig;
use std::process::ExitCode;
use suites::{Collaborators, SuiteOptions};
use tracing::{error, info};

const SERVICE_NAME: &str = "aqa";
const LOG_FILE: &str = "test_execution.log";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = HarnessConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        config.runner.output_dir = dir.clone();
    }

    let _guard = aqa_telemetry::init_with_log_file(SERVICE_NAME, &config.runner.output_dir, LOG_FILE)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    println!("Agent QA Runner");
    println!("{}", "=".repeat(50));
    println!("Test Type: {:?}", cli.test_type);
    println!("Output Directory: {}", config.runner.output_dir.display());
    println!("Fail Fast: {}", cli.fail_fast);

    let code = match run(&cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "test execution failed");
            eprintln!("Test execution failed: {:#}", e);
            1
        }
    };

    println!("\nTests completed with exit code: {}", code);
    Ok(ExitCode::from(code))
}

async fn run(cli: &Cli, mut config: HarnessConfig) -> Result<u8> {
    if cli.generate_datasets {
        let dir = config.runner.output_dir.join("datasets");
        let written = save_default_datasets(&dir)?;
        info!(count = written.len(), dir = %dir.display(), "generated golden datasets");
    }

    let collaborators = Collaborators::connect(&config)?;
    let metrics = config.metrics.clone();
    let options = SuiteOptions {
        runner: config.runner.clone(),
        filter: TestFilter { severities: cli.severities(), categories: None },
        fail_fast: cli.fail_fast,
    };
    let exit = |failed: usize| if failed == 0 { 0 } else { 1 };

    let code = match cli.test_type {
        TestType::Ci => {
            if let Some(severities) = cli.severities() {
                config.ci.required_severities = severities;
            }
            config.ci.fail_fast |= cli.fail_fast;
            let report = suites::run_ci(&collaborators, config.runner, config.ci, &metrics).await?;
            u8::try_from(report.exit_code).unwrap_or(1)
        }
        TestType::Sage => exit(suites::run_sage(&collaborators, &options, &metrics).await?.summary.failed),
        TestType::Teams => exit(suites::run_teams(&collaborators, &options, &metrics).await?.summary.failed),
        TestType::System => exit(suites::run_system(&collaborators, &options).await?.summary.failed),
        TestType::Performance => {
            exit(suites::run_performance(&collaborators, &options).await?.summary.failed)
        }
        TestType::All => {
            println!("Running all test suites...");
            let failed = suites::run_sage(&collaborators, &options, &metrics).await?.summary.failed
                + suites::run_teams(&collaborators, &options, &metrics).await?.summary.failed
                + suites::run_system(&collaborators, &options).await?.summary.failed
                + suites::run_performance(&collaborators, &options).await?.summary.failed;
            exit(failed)
        }
    };
    Ok(code)
}
