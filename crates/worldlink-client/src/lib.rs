//! WorldLink client library
//!
//! This library provides the components of the WorldLink command-line client,
//! including the session loop, packet handlers, and chat command parsing.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod game;
pub mod handlers;
pub mod session;
pub mod world;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{CliError, Result};
pub use session::Session;

// Re-export commonly used types
pub use worldlink_core::{Connection, OpCode, SessionKey};
