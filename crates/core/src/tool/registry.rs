use std::collections::HashMap;

use steward_model::{ModelTool, ToolCallRequest};
use tracing::Instrument;

use crate::conversation::{ToolMessage, ToolStatus};
use crate::tool::{AnyTool, Error, Tool, ToolObject};

/// The set of tools offered to the model, and the dispatcher for the tool
/// calls it makes.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn ToolObject>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Registers a tool. A tool with the same name replaces the earlier one.
    pub fn register<T: Tool>(&mut self, tool: T) {
        self.insert(Box::new(AnyTool(tool)));
    }

    pub(crate) fn insert(&mut self, tool: Box<dyn ToolObject>) {
        let name = tool.name().to_owned();
        match self.by_name.get(&name) {
            Some(&idx) => {
                warn!("tool `{name}` registered twice, keeping the latest");
                self.tools[idx] = tool;
            }
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Runs every request in order and returns exactly one result message
    /// per request, in the same order.
    ///
    /// Failures never abort the batch; they come back as error messages so
    /// the model can correct itself.
    pub async fn dispatch(&self, requests: &[ToolCallRequest]) -> Vec<ToolMessage> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            results.push(self.execute(req).await);
        }
        results
    }

    async fn execute(&self, req: &ToolCallRequest) -> ToolMessage {
        let result = match self.by_name.get(&req.name) {
            Some(&idx) => {
                trace!("running tool ({}) with args: {}", req.id, req.arguments);
                self.tools[idx]
                    .execute(req.arguments.clone())
                    .instrument(debug_span!("tool execute", tool = %req.name))
                    .await
            }
            None => {
                warn!("tool not found: {}", req.name);
                Err(Error::not_found()
                    .with_reason(format!("Tool \"{}\" not found.", req.name)))
            }
        };

        let (content, status) = match result {
            Ok(output) => (output, ToolStatus::Success),
            Err(err) => {
                debug!("tool `{}` failed: {err}", req.name);
                (
                    format!("Error: {err}\n Please fix your mistakes."),
                    ToolStatus::Error,
                )
            }
        };
        ToolMessage {
            tool_call_id: req.id.clone(),
            name: req.name.clone(),
            content,
            status,
        }
    }
}
