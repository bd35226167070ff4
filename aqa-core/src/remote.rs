//! JSON-over-HTTP agent collaborator.
//!
//! The endpoint receives `{"message": ..., "options": {...}}` and must answer
//! with an [`AgentResponse`] document.

use crate::{Agent, AgentResponse, AqaError, Result, RunOptions};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct RunRequest<'a> {
    message: &'a str,
    options: &'a RunOptions,
}

/// Agent reachable over HTTP.
pub struct HttpAgent {
    name: String,
    endpoint: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl HttpAgent {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AqaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { name: name.into(), endpoint: endpoint.into(), timeout, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> AqaError {
        match self.timeout {
            Some(limit) if e.is_timeout() => AqaError::Timeout(limit.as_secs_f64()),
            _ => AqaError::Http(e.to_string()),
        }
    }
}

#[async_trait]
impl Agent for HttpAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, message: &str, options: &RunOptions) -> Result<AgentResponse> {
        debug!(agent.name = %self.name, endpoint = %self.endpoint, "sending agent request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RunRequest { message, options })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AqaError::Agent(format!("{} returned {}: {}", self.name, status, body)));
        }

        response.json::<AgentResponse>().await.map_err(|e| match self.classify(e) {
            AqaError::Http(message) => AqaError::Http(format!("invalid response body: {}", message)),
            other => other,
        })
    }
}
