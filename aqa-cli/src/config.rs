use anyhow::{Context, Result};
use aqa_eval::{CiConfig, MetricsConfig, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "aqa.toml";

/// Where to reach one agent or team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    pub endpoint: String,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

/// Contents of `aqa.toml`; every section is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL for agents without an `[agents.<name>]` entry
    pub agent_base_url: String,
    pub runner: RunnerConfig,
    pub ci: CiConfig,
    pub metrics: MetricsConfig,
    pub agents: BTreeMap<String, AgentEndpoint>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            agent_base_url: "http://localhost:8000".to_string(),
            runner: RunnerConfig::default(),
            ci: CiConfig::default(),
            metrics: MetricsConfig::default(),
            agents: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Load an explicit file, or `aqa.toml` from the working directory when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() { Self::from_file(&default) } else { Ok(Self::default()) }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Configured endpoint for `name`, or `{agent_base_url}/agents/{name}/run`.
    pub fn endpoint(&self, name: &str) -> AgentEndpoint {
        self.agents.get(name).cloned().unwrap_or_else(|| AgentEndpoint {
            endpoint: format!("{}/agents/{}/run", self.agent_base_url.trim_end_matches('/'), name),
            timeout_secs: None,
        })
    }
}

impl AgentEndpoint {
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.timeout_secs
            .map(Duration::try_from_secs_f64)
            .transpose()
            .with_context(|| format!("Invalid timeout for {}", self.endpoint))
    }
}
