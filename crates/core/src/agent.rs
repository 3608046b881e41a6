mod builder;
mod run;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::Instrument;

use crate::checkpoint::Checkpointer;
use crate::conversation::{Conversation, Message};
use crate::error::AgentError;
use crate::model_client::ModelClient;
use crate::tool::ToolRegistry;
pub use builder::AgentBuilder;

/// The number of steps (model turns plus tool turns) one invocation may
/// take before it is aborted.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Where a piece of transcript comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Streamed text from the model.
    Assistant,
    /// The output of a tool call, reported once the call finished.
    Tool,
}

type OnTranscript = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// A configured agent: a model, a set of tools and optionally a store
/// that remembers conversations per thread.
///
/// Each invocation runs the model/tool loop to completion before it
/// returns. Invocations on different threads are independent.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    recursion_limit: usize,
    on_transcript: Option<OnTranscript>,
}

impl Agent {
    /// Sends one user message on the given thread and runs until the model
    /// gives a final answer. Returns the whole conversation of the thread.
    ///
    /// Without a checkpointer every invocation starts a fresh conversation
    /// and `thread_id` is only used for logging.
    pub async fn invoke<S: Into<String>>(
        &self,
        input: S,
        thread_id: &str,
    ) -> Result<Conversation, AgentError> {
        self.invoke_on_thread(input.into(), thread_id)
            .instrument(info_span!("invoke", thread_id))
            .await
    }

    async fn invoke_on_thread(
        &self,
        input: String,
        thread_id: &str,
    ) -> Result<Conversation, AgentError> {
        let mut conversation = match &self.checkpointer {
            Some(checkpointer) => {
                checkpointer.load(thread_id).await.unwrap_or_default()
            }
            None => Conversation::default(),
        };
        debug!("resuming with {} messages", conversation.len());
        conversation.push(Message::human(input));

        self.run(&mut conversation).await?;

        if let Some(checkpointer) = &self.checkpointer {
            checkpointer.save(thread_id, conversation.clone()).await;
        }
        Ok(conversation)
    }

    /// Like [`Agent::invoke`], but only returns the text of the final
    /// message.
    pub async fn ask<S: Into<String>>(
        &self,
        input: S,
        thread_id: &str,
    ) -> Result<String, AgentError> {
        let conversation = self.invoke(input, thread_id).await?;
        Ok(conversation.last_content().unwrap_or_default().to_owned())
    }

    /// Returns the names of the tools offered to the model.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .definitions()
            .into_iter()
            .map(|tool| tool.name)
            .collect()
    }
}
