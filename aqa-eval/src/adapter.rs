//! Bridge between agents and an external scenario-simulation framework.
//!
//! The framework drives a conversation through [`ScenarioAdapter::call`] and
//! expects the agent's new turns back as [`FormattedMessage`]s.

use crate::error::Result;
use aqa_core::{Agent, Role, ToolCall, TranscriptMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// One turn of the framework's conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub thread_id: String,
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
}

impl AgentInput {
    pub fn new(thread_id: impl Into<String>, messages: Vec<TranscriptMessage>) -> Self {
        Self { thread_id: thread_id.into(), messages }
    }

    /// Content of the most recent user message, empty if there is none.
    pub fn last_new_user_message_str(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str())
    }
}

/// Message shape expected back by the scenario framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[async_trait]
pub trait ScenarioAdapter: Send + Sync {
    async fn call(&self, input: &AgentInput) -> Result<Vec<FormattedMessage>>;
}

/// Convert transcript messages, dropping any that carry nothing.
///
/// A message is kept when it has content, when it is an assistant turn with
/// tool calls, or when it is a tool result with a call id.
pub fn format_messages(messages: &[TranscriptMessage]) -> Vec<FormattedMessage> {
    messages
        .iter()
        .filter_map(|message| {
            let tool_calls = (message.role == Role::Assistant && !message.tool_calls().is_empty())
                .then(|| message.tool_calls().to_vec());
            let tool_call_id = message
                .tool_call_id()
                .filter(|id| message.role == Role::Tool && !id.is_empty())
                .map(str::to_string);

            if message.content.is_empty() && tool_calls.is_none() && tool_call_id.is_none() {
                return None;
            }
            Some(FormattedMessage {
                role: message.role,
                content: message.content.clone(),
                tool_calls,
                tool_call_id,
            })
        })
        .collect()
}

/// Runs an [`Agent`] for each framework turn, keyed to the framework's thread
pub struct AgentAdapter {
    agent: Arc<dyn Agent>,
}

impl AgentAdapter {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl ScenarioAdapter for AgentAdapter {
    async fn call(&self, input: &AgentInput) -> Result<Vec<FormattedMessage>> {
        let mut options = serde_json::Map::new();
        options.insert("user_id".to_string(), json!(input.thread_id));
        options.insert("session_id".to_string(), Value::String(input.thread_id.clone()));

        tracing::debug!(agent.name = %self.agent.name(), thread_id = %input.thread_id, "scenario turn");
        let response = self.agent.run(input.last_new_user_message_str(), &options).await?;

        let messages = if response.messages.is_empty() {
            let message = if response.tool_calls.is_empty() {
                TranscriptMessage::assistant(response.content)
            } else {
                TranscriptMessage::assistant_tool_calls(response.content, response.tool_calls)
            };
            vec![message]
        } else {
            response.messages
        };
        Ok(format_messages(&messages))
    }
}
