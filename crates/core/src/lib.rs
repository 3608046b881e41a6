//! The agent loop: conversation state, the routing decision between the
//! model and the tools, tool dispatch and per-thread checkpoints.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod checkpoint;
pub mod conversation;
mod error;
pub mod graph;
mod model_client;
pub mod route;
pub mod tool;

pub use agent::{Agent, AgentBuilder, DEFAULT_RECURSION_LIMIT, TranscriptSource};
pub use conversation::{AiMessage, Conversation, Message, Role, ToolMessage, ToolStatus};
pub use error::AgentError;
pub use route::{InvalidStateError, Route, should_continue};
pub use tool::Tool;
