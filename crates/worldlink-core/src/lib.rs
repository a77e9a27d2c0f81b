//! Worldlink Protocol Engine
//!
//! This crate implements the client side of a stateful binary game-server
//! protocol: frame codec with encrypted variable-length headers, the socket
//! reader state machine, the reader-to-session handoff queue, command
//! dispatch, the outbound writer, and a flag-aware action scheduler. It
//! carries no game rules of its own; payload meaning belongs to the
//! application sitting on top.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod connection;
pub mod crypt;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod opcodes;
pub mod packet;
pub mod queue;
pub mod reader;
pub mod scheduler;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use connection::{Connection, PacketSender};
pub use crypt::{CipherPair, HeaderCipher};
pub use dispatch::{Dispatcher, Handler};
pub use error::{CryptError, CursorError, FrameError, ReadError, Result, WorldlinkError};
pub use header::{ClientHeader, ServerHeader};
pub use packet::{InPacket, OutPacket};
pub use queue::BatchQueue;
pub use reader::FrameReader;
pub use scheduler::{ActionFlags, ActionId, ActionScheduler};
pub use types::{OpCode, SessionKey, TrafficCounters};
