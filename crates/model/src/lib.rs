//! The protocol between the agent loop and hosted language models.
//!
//! A model is reached through a [`ModelProvider`], which accepts the whole
//! conversation plus the declared tools and answers with a stream of
//! [`ModelResponseEvent`]s. The agent never needs to know which vendor sits
//! behind a provider, so swapping models is a configuration change.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
