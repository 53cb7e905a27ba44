//! snap: interactive git workflows on the terminal.
//!
//! Every interactive command is a [`Flow`](engine::Flow) driven by the same
//! session engine: a pure transition function over (state, payload, event),
//! with side effects requested as data and executed off the input path.

pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod flows;
pub mod git;
pub mod logging;
pub mod ollama;
pub mod output;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use engine::{Flow, Session};
pub use error::{Result, SnapError};
