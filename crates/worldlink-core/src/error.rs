//! Error types for the worldlink protocol engine
//!
//! Each layer reports its own failure domain (framing, payload decoding,
//! key handling, socket reads) and the top-level `WorldlinkError` unifies
//! them for callers that only care whether the session can continue.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Frame header violations, in either direction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame size {size} is below the {min}-byte command minimum")]
    SizeTooSmall { size: u32, min: u32 },
    #[error("frame size {size} exceeds the {max}-byte limit")]
    SizeTooLarge { size: u32, max: u32 },
    #[error("outbound payload of {payload} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { payload: usize, max: usize },
}

/// Payload decoding failures raised by the read cursor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("payload ended early: needed {needed} more bytes, {remaining} left")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("string field is missing its terminator")]
    UnterminatedString,
}

/// Session-key and cipher setup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptError {
    #[error("session key is not valid hex")]
    InvalidKeyEncoding,
    #[error("session key must be {expected} bytes, got {length}", expected = crate::types::SessionKey::LEN)]
    InvalidKeyLength { length: usize },
    #[error("header key derivation failed")]
    KeyDerivationFailed,
}

/// Failures surfaced by the socket reader task.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the worldlink protocol engine.
#[derive(Debug, Error)]
pub enum WorldlinkError {
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("malformed payload: {0}")]
    Cursor(#[from] CursorError),

    #[error("cipher setup failed: {0}")]
    Crypt(#[from] CryptError),

    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer task is gone, so nothing can be sent any more.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("handler for {opcode} failed: {message}")]
    Handler { opcode: crate::types::OpCode, message: String },
}

impl WorldlinkError {
    /// Create a handler error with a message, tagged with the command it
    /// was processing.
    pub fn handler<T: Into<String>>(opcode: crate::types::OpCode, message: T) -> Self {
        WorldlinkError::Handler {
            opcode,
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, WorldlinkError>;
