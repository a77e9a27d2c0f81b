//! Socket reader state machine
//!
//! Frames arrive as an encrypted variable-length header followed by a plain
//! payload, and the TCP stream is free to split or merge them arbitrarily.
//! The reader keeps exactly one read in flight, always asks for just the
//! bytes its current phase still needs, and walks a frame through four
//! phases:
//!
//!   first byte -> header remainder -> payload -> dispatch
//!
//! The first header byte is decrypted alone because the header's own length
//! hangs off it; the remainder is decrypted as a block once complete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, trace, warn};

use crate::crypt::HeaderCipher;
use crate::error::ReadError;
use crate::header::ServerHeader;
use crate::packet::InPacket;
use crate::queue::BatchQueue;
use crate::types::{OpCode, TrafficCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadPhase {
    FirstByte,
    HeaderRemainder,
    Payload,
    Dispatching,
}

/// Pulls complete frames off one half of the connection.
pub struct FrameReader<R> {
    stream: R,
    cipher: Arc<Mutex<HeaderCipher>>,
    counters: Arc<TrafficCounters>,
    shutdown: Arc<AtomicBool>,
    phase: ReadPhase,
    header: [u8; 5],
    header_len: usize,
    opcode: OpCode,
    payload: Vec<u8>,
    filled: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(
        stream: R,
        cipher: Arc<Mutex<HeaderCipher>>,
        counters: Arc<TrafficCounters>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            stream,
            cipher,
            counters,
            shutdown,
            phase: ReadPhase::FirstByte,
            header: [0u8; 5],
            header_len: 0,
            opcode: OpCode::new(0),
            payload: Vec::new(),
            filled: 0,
        }
    }

    fn decrypt(cipher: &Mutex<HeaderCipher>, bytes: &mut [u8]) {
        cipher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(bytes);
    }

    /// Read until one frame is complete.
    ///
    /// `Ok(None)` means the peer closed the connection or shutdown was
    /// requested; a frame cut off mid-way counts as closed too.
    pub async fn next_frame(&mut self) -> Result<Option<InPacket>, ReadError> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(None);
            }

            match self.phase {
                ReadPhase::Dispatching => {
                    self.phase = ReadPhase::FirstByte;
                }
                ReadPhase::FirstByte => {
                    let n = self.stream.read(&mut self.header[..1]).await?;
                    if n == 0 {
                        return Ok(None);
                    }
                    Self::decrypt(&self.cipher, &mut self.header[..1]);
                    self.header_len = ServerHeader::wire_len(self.header[0]);
                    self.filled = 1;
                    self.phase = ReadPhase::HeaderRemainder;
                }
                ReadPhase::HeaderRemainder => {
                    if self.filled < self.header_len {
                        let n = self
                            .stream
                            .read(&mut self.header[self.filled..self.header_len])
                            .await?;
                        if n == 0 {
                            return Ok(None);
                        }
                        self.filled += n;
                        continue;
                    }

                    Self::decrypt(&self.cipher, &mut self.header[1..self.header_len]);
                    let parsed = ServerHeader::parse(&self.header[..self.header_len])?;
                    self.opcode = parsed.opcode;

                    if parsed.payload_len == 0 {
                        self.phase = ReadPhase::Dispatching;
                        return Ok(Some(self.complete(Vec::new())));
                    }
                    self.payload = vec![0u8; parsed.payload_len];
                    self.filled = 0;
                    self.phase = ReadPhase::Payload;
                }
                ReadPhase::Payload => {
                    if self.filled < self.payload.len() {
                        let n = self.stream.read(&mut self.payload[self.filled..]).await?;
                        if n == 0 {
                            return Ok(None);
                        }
                        self.filled += n;
                        continue;
                    }

                    self.phase = ReadPhase::Dispatching;
                    let payload = std::mem::take(&mut self.payload);
                    return Ok(Some(self.complete(payload)));
                }
            }
        }
    }

    fn complete(&self, payload: Vec<u8>) -> InPacket {
        self.counters
            .add_received((self.header_len + payload.len()) as u64);
        trace!("Received {} ({} bytes)", self.opcode, payload.len());
        InPacket::new(self.opcode, payload)
    }

    /// Drive the reader until the connection ends, handing every frame to
    /// the session's queue.
    pub async fn run(mut self, queue: Arc<BatchQueue<InPacket>>) {
        loop {
            match self.next_frame().await {
                Ok(Some(packet)) => queue.push(packet),
                Ok(None) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        info!("Server has closed the connection");
                    }
                    break;
                }
                Err(err) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        warn!("Read failed: {}", err);
                    } else {
                        debug!("Read aborted during shutdown: {}", err);
                    }
                    break;
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
