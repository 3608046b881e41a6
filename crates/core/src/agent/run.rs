use std::sync::Arc;

use steward_model::{ModelMessage, ModelRequest};
use tracing::Instrument;

use super::{Agent, TranscriptSource};
use crate::conversation::{Conversation, Message};
use crate::error::AgentError;
use crate::graph::{AGENT_NODE, TOOLS_NODE};
use crate::model_client::OnDelta;
use crate::route::{Route, should_continue};

/// The stage of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum AgentStage {
    /// The model is about to be called with the current history.
    #[default]
    AgentTurn,
    /// The tool calls of the latest model message are about to run.
    ToolTurn,
    /// The latest message is the final answer.
    Done,
}

impl AgentStage {
    /// The stage that follows a model turn.
    #[inline]
    pub(crate) fn after_agent_turn(route: Route) -> Self {
        match route {
            Route::DispatchTools => AgentStage::ToolTurn,
            Route::Terminate => AgentStage::Done,
        }
    }
}

impl Agent {
    /// Drives the conversation until the model stops requesting tools.
    pub(crate) async fn run(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(), AgentError> {
        let mut stage = AgentStage::default();
        let mut steps = 0;

        loop {
            stage = match stage {
                AgentStage::AgentTurn => {
                    self.take_step(&mut steps)?;
                    self.agent_turn(conversation)
                        .instrument(debug_span!("node", name = AGENT_NODE))
                        .await?;
                    let route = should_continue(conversation.messages())?;
                    AgentStage::after_agent_turn(route)
                }
                AgentStage::ToolTurn => {
                    self.take_step(&mut steps)?;
                    self.tool_turn(conversation)
                        .instrument(debug_span!("node", name = TOOLS_NODE))
                        .await;
                    AgentStage::AgentTurn
                }
                AgentStage::Done => {
                    debug!("run finished after {steps} steps");
                    return Ok(());
                }
            };
            trace!("next stage: {stage:?}");
        }
    }

    fn take_step(&self, steps: &mut usize) -> Result<(), AgentError> {
        if *steps >= self.recursion_limit {
            warn!("recursion limit {} reached", self.recursion_limit);
            return Err(AgentError::RecursionLimit {
                limit: self.recursion_limit,
            });
        }
        *steps += 1;
        Ok(())
    }

    async fn agent_turn(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(), AgentError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ModelMessage::System(prompt.clone()));
        }
        messages.extend(conversation.to_model_messages());
        let request = ModelRequest {
            messages,
            tools: self.tools.definitions(),
        };

        let on_delta = self.on_transcript.as_ref().map(|on_transcript| {
            let on_transcript = Arc::clone(on_transcript);
            Arc::new(move |delta: &str| {
                on_transcript(delta, TranscriptSource::Assistant)
            }) as OnDelta
        });
        let answer = self
            .model_client
            .send_request(request, on_delta)
            .await
            .map_err(AgentError::Model)?;
        conversation.push(Message::Ai(answer));
        Ok(())
    }

    async fn tool_turn(&self, conversation: &mut Conversation) {
        let requests = match conversation.last() {
            Some(last) => last.tool_calls().to_vec(),
            None => return,
        };
        for result in self.tools.dispatch(&requests).await {
            if let Some(on_transcript) = &self.on_transcript {
                on_transcript(&result.content, TranscriptSource::Tool);
            }
            conversation.push(Message::Tool(result));
        }
    }
}
