use crate::{AgentResponse, Result, RunOptions};
use async_trait::async_trait;

/// An agent or team under test.
///
/// The harness never looks inside a collaborator: it sends one message plus
/// keyword options and scores whatever comes back.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, message: &str, options: &RunOptions) -> Result<AgentResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AqaError;
    use std::sync::Arc;

    struct TestAgent {
        name: String,
    }

    #[async_trait]
    impl Agent for TestAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, message: &str, _options: &RunOptions) -> Result<AgentResponse> {
            if message.is_empty() {
                return Err(AqaError::Agent("empty message".to_string()));
            }
            Ok(AgentResponse::text(format!("echo: {message}")))
        }
    }

    #[tokio::test]
    async fn test_agent_trait() {
        let agent: Arc<dyn Agent> = Arc::new(TestAgent { name: "test".to_string() });
        assert_eq!(agent.name(), "test");

        let response = agent.run("hello", &RunOptions::new()).await.unwrap();
        assert_eq!(response.content, "echo: hello");

        assert!(agent.run("", &RunOptions::new()).await.is_err());
    }
}
