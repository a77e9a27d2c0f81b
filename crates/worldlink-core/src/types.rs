//! Core types for the world protocol
//!
//! Newtype wrappers for the values that cross component boundaries: the
//! opcode tag, the session key handed over by the authenticator, and the
//! session byte counters shared between the read and write paths.

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CryptError;

// ----------------------------------------------------------------------------
// Opcode
// ----------------------------------------------------------------------------

/// Command tag identifying a frame's semantic type.
///
/// Server headers carry it as a 16-bit value; the outbound header widens it
/// to 32 bits on the wire but the value space is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpCode(u16);

impl OpCode {
    /// Create an opcode from its raw protocol value
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw protocol value
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::opcodes::name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

impl From<u16> for OpCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

// ----------------------------------------------------------------------------
// Session Key
// ----------------------------------------------------------------------------

/// The 40-byte shared secret produced by the authentication exchange.
///
/// The engine never derives this value; it is supplied once and used to
/// seed the per-direction header ciphers and the session proof digest.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; Self::LEN]);

impl SessionKey {
    pub const LEN: usize = 40;

    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl FromStr for SessionKey {
    type Err = CryptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean).map_err(|_| CryptError::InvalidKeyEncoding)?;
        if bytes.len() != Self::LEN {
            return Err(CryptError::InvalidKeyLength { length: bytes.len() });
        }
        let mut key = [0u8; Self::LEN];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }
}

// Key material stays out of logs.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

// ----------------------------------------------------------------------------
// Traffic Counters
// ----------------------------------------------------------------------------

/// Cumulative byte counters for one session.
///
/// Updated from the reader task and the writer task concurrently, read from
/// the application loop; all monotonic.
#[derive(Debug, Default)]
pub struct TrafficCounters {
    sent: AtomicU64,
    received: AtomicU64,
    transferred: AtomicU64,
}

impl TrafficCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sent(&self, bytes: u64) {
        self.sent.fetch_add(bytes, Ordering::Relaxed);
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_received(&self, bytes: u64) {
        self.received.fetch_add(bytes, Ordering::Relaxed);
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }
}
