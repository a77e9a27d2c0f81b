//! Error handling for the worldlink client

use thiserror::Error;

/// Client-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("protocol error: {0}")]
    Protocol(#[from] worldlink_core::WorldlinkError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("session key error: {0}")]
    SessionKey(#[from] worldlink_core::CryptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, CliError>;
