//! Result and report persistence

use crate::error::{EvalError, Result};
use crate::report::RunReport;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const LATEST_RESULTS_FILE: &str = "latest_results.json";

/// Write `value` as pretty JSON, replacing `path` atomically.
///
/// Readers polling `path` see either the previous document or the new one,
/// never a partial write.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| EvalError::LoadError(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| EvalError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Persists run reports under a fixed output directory
#[derive(Debug, Clone)]
pub struct ResultStore {
    output_dir: PathBuf,
}

impl ResultStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.output_dir.join(LATEST_RESULTS_FILE)
    }

    /// Save the timestamped copy and overwrite the latest one.
    ///
    /// Returns the timestamped path.
    pub async fn save(&self, report: &RunReport) -> Result<PathBuf> {
        let stamp = report.started_at.format("%Y%m%d_%H%M%S");
        let prefix: String = report.run_id.chars().take(8).collect();
        let path = self.output_dir.join(format!("test_results_{}_{}.json", stamp, prefix));

        write_json_atomic(&path, report).await?;
        write_json_atomic(&self.latest_path(), report).await?;
        tracing::info!(path = %path.display(), "saved test results");
        Ok(path)
    }

    pub async fn load_latest(&self) -> Result<RunReport> {
        read_json(&self.latest_path()).await
    }
}
