use std::sync::Arc;

use steward_model::ModelProvider;

use super::{Agent, DEFAULT_RECURSION_LIMIT, TranscriptSource};
use crate::checkpoint::Checkpointer;
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolRegistry};

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    recursion_limit: usize,
    on_transcript: Option<Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: ToolRegistry::default(),
            system_prompt: None,
            checkpointer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            on_transcript: None,
        }
    }

    /// Sets instructions sent ahead of every conversation. They are not
    /// stored in the conversation itself.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Remembers conversations per thread in `checkpointer`.
    #[inline]
    pub fn with_checkpointer<C: Checkpointer + 'static>(
        self,
        checkpointer: C,
    ) -> Self {
        self.with_shared_checkpointer(Arc::new(checkpointer))
    }

    /// Like [`AgentBuilder::with_checkpointer`], for a store that is also
    /// used elsewhere.
    #[inline]
    pub fn with_shared_checkpointer(
        mut self,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Sets the maximum number of steps per invocation. Values below 1
    /// are raised to 1.
    #[inline]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit.max(1);
        self
    }

    /// Attaches a callback that receives model text as it streams in and
    /// tool outputs as they finish.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let AgentBuilder {
            model_client,
            tools,
            system_prompt,
            checkpointer,
            recursion_limit,
            on_transcript,
        } = self;
        debug!("agent built with {} tools", tools.len());
        Agent {
            model_client,
            tools,
            system_prompt,
            checkpointer,
            recursion_limit,
            on_transcript,
        }
    }
}
