use std::sync::Arc;

use steward_core::checkpoint::{Checkpointer, MemorySaver};
use steward_core::{Agent, AgentBuilder, AgentError, TranscriptSource};
use steward_model::ModelProvider;

use crate::tools::*;

/// Thread used when the caller does not pick one.
pub const DEFAULT_THREAD_ID: &str = "42";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    tavily_api_key: Option<String>,
    thread_id: String,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            tavily_api_key: None,
            thread_id: DEFAULT_THREAD_ID.to_owned(),
        }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the credential used by the web search tool.
    #[inline]
    pub fn with_tavily_api_key(mut self, api_key: Option<String>) -> Self {
        self.tavily_api_key = api_key;
        self
    }

    /// Sets the thread the session talks on.
    #[inline]
    pub fn with_thread_id<S: Into<String>>(mut self, thread_id: S) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session with the date/time, calculator and web search
    /// tools, remembering the conversation in memory.
    pub fn build(self) -> Session {
        let checkpointer: Arc<dyn Checkpointer> = Arc::new(MemorySaver::new());
        let agent = self
            .agent_builder
            .with_tool(DateTimeTool::new())
            .with_tool(CalculatorTool::new())
            .with_tool(WebSearchTool::new(self.tavily_api_key))
            .with_shared_checkpointer(checkpointer)
            .build();

        Session {
            agent,
            thread_id: self.thread_id,
        }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent and the thread it talks on,
/// so consecutive messages share one conversation.
pub struct Session {
    agent: Agent,
    thread_id: String,
}

impl Session {
    /// Sends a message and waits for the final answer.
    pub async fn send_message(&self, message: &str) -> Result<String, AgentError> {
        self.agent.ask(message, &self.thread_id).await
    }

    /// Returns the thread this session talks on.
    #[inline]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use steward_model::ToolCallRequest;
    use steward_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    #[tokio::test]
    async fn test_session_tools_and_memory() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_turn(PresetResponse::tool_calls(vec![
            ToolCallRequest {
                id: "call_1".to_owned(),
                name: "calculator".to_owned(),
                arguments: json!({ "input": "6 * 7" }),
            },
        ]));
        provider.add_assistant_turn(PresetResponse::text("42"));
        provider.add_assistant_turn(PresetResponse::text("still 42"));

        let session = SessionBuilder::with_model_provider(provider.clone())
            .with_thread_id("t-1")
            .build();
        assert_eq!(
            session.agent().tool_names(),
            ["todays_date_time", "calculator", "tavily_search_results_json"]
        );

        assert_eq!(session.send_message("what is 6 * 7?").await.unwrap(), "42");
        assert_eq!(session.send_message("and again?").await.unwrap(), "still 42");

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        // human, ai(tool call), tool, ai, human
        assert_eq!(requests[2].messages.len(), 5);
    }
}
