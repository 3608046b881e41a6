//! The decision made after every model turn.

use crate::conversation::Message;

/// Where the run goes after the model has answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// The model requested tools; run them and ask the model again.
    DispatchTools,
    /// The latest message is a final answer.
    Terminate,
}

/// Routing was asked to decide on an empty message sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("cannot route an empty message sequence")]
pub struct InvalidStateError;

/// Decides whether the run must dispatch tools or is finished.
///
/// Only the last message is inspected: the run continues exactly when it
/// is a model message carrying at least one tool call.
pub fn should_continue(messages: &[Message]) -> Result<Route, InvalidStateError> {
    let last = messages.last().ok_or(InvalidStateError)?;
    match last {
        Message::Ai(msg) if !msg.tool_calls.is_empty() => Ok(Route::DispatchTools),
        _ => Ok(Route::Terminate),
    }
}
