//! An out-of-the-box agent that answers with the help of a few tools: the
//! current date and time, a calculator and a web search.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the agent into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod config;
mod session;
pub mod tools;

pub use config::{AppConfig, ConfigError};
pub use session::{DEFAULT_THREAD_ID, Session, SessionBuilder};

/// Re-exports of [`steward_core`] crate.
pub mod core {
    pub use steward_core::*;
}
