//! Typed conversation messages exchanged with scenario frameworks.

use crate::types::ToolCall;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// What a message carries besides its text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    #[default]
    Text,
    /// An assistant turn that invoked tools.
    ToolCalls { tool_calls: Vec<ToolCall> },
    /// A tool's answer to an earlier call.
    ToolResult { tool_call_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub body: MessageBody,
}

impl TranscriptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), body: MessageBody::Text }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), body: MessageBody::Text }
    }

    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            body: MessageBody::ToolCalls { tool_calls },
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            body: MessageBody::ToolResult { tool_call_id: tool_call_id.into() },
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.body {
            MessageBody::ToolCalls { tool_calls } => tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::ToolResult { tool_call_id } => Some(tool_call_id.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_accessors() {
        let call = TranscriptMessage::assistant_tool_calls("", vec![ToolCall::new("search")]);
        assert_eq!(call.tool_calls().len(), 1);
        assert!(call.tool_call_id().is_none());

        let result = TranscriptMessage::tool_result("call_123", "Tool result content");
        assert_eq!(result.tool_call_id(), Some("call_123"));
        assert!(result.tool_calls().is_empty());
    }

    #[test]
    fn test_body_defaults_to_text() {
        let msg: TranscriptMessage =
            serde_json::from_str(r#"{"role": "assistant", "content": "Hi"}"#).unwrap();
        assert_eq!(msg.body, MessageBody::Text);
        assert_eq!(msg.role.to_string(), "assistant");
    }
}
