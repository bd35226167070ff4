use crate::transcript::TranscriptMessage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keyword arguments forwarded to an agent run alongside the message.
pub type RunOptions = Map<String, Value>;

/// A single tool invocation reported by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID for OpenAI-style providers. None when the provider has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self { id: None, tool_name: tool_name.into(), arguments: Value::Object(Map::new()) }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }
}

/// What an agent (or team) hands back from one run.
///
/// Everything except `content` is optional and defaults to empty, so adapters
/// only fill in what their collaborator actually reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final text produced by the run.
    #[serde(default)]
    pub content: String,
    /// Tools invoked during the run, in call order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Reference passages the agent retrieved to ground its answer.
    #[serde(default)]
    pub contexts: Vec<String>,
    /// Names of team members that took part (teams only).
    #[serde(default)]
    pub member_runs: Vec<String>,
    /// Structured outcome flags reported by the collaborator
    /// (e.g. `booking_attempted: true`).
    #[serde(default)]
    pub outcome: Map<String, Value>,
    /// Messages appended to the conversation by this run.
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
}

impl AgentResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_member_runs(mut self, members: Vec<String>) -> Self {
        self.member_runs = members;
        self
    }

    pub fn with_outcome(mut self, key: impl Into<String>, value: Value) -> Self {
        self.outcome.insert(key.into(), value);
        self
    }

    pub fn with_messages(mut self, messages: Vec<TranscriptMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Names of the tools called, in call order (duplicates kept).
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.tool_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_defaults_from_minimal_json() {
        let response: AgentResponse = serde_json::from_value(json!({"content": "hi"})).unwrap();
        assert_eq!(response.content, "hi");
        assert!(response.tool_calls.is_empty());
        assert!(response.contexts.is_empty());
        assert!(response.outcome.is_empty());
    }

    #[test]
    fn test_tool_names_keep_order() {
        let response = AgentResponse::text("done").with_tool_calls(vec![
            ToolCall::new("search_knowledge_base"),
            ToolCall::new("web_search").with_id("call_1"),
        ]);
        assert_eq!(response.tool_names(), vec!["search_knowledge_base", "web_search"]);
    }

    #[test]
    fn test_tool_call_omits_missing_id() {
        let value = serde_json::to_value(ToolCall::new("maps_api")).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["tool_name"], "maps_api");
    }
}
