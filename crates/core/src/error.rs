use steward_model::{ErrorKind, ModelProviderError};

use crate::route::InvalidStateError;

/// Errors that end a run.
///
/// Tool failures are not among them: they are reported back to the model
/// as tool messages.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The model endpoint failed (authentication, rate limit, network,
    /// malformed stream).
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// The run reached a state the loop cannot continue from.
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),
    /// The run took more steps than allowed.
    #[error("recursion limit of {limit} reached without a final answer")]
    RecursionLimit {
        /// The configured limit.
        limit: usize,
    },
}

impl AgentError {
    /// Returns the provider error kind, if the model failed.
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            AgentError::Model(err) => Some(err.kind()),
            _ => None,
        }
    }
}
