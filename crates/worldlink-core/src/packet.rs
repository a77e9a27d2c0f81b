//! Inbound payload cursor and outbound frame builder
//!
//! `InPacket` wraps a decoded frame and hands out little-endian fields one
//! read at a time, refusing to run past the end. `OutPacket` collects a
//! payload and finalizes it into one contiguous wire frame with the header
//! encrypted in place.

use crate::crypt::HeaderCipher;
use crate::error::{CursorError, FrameError};
use crate::header::ClientHeader;
use crate::types::OpCode;

// ----------------------------------------------------------------------------
// Inbound Packet
// ----------------------------------------------------------------------------

/// A received frame with a read cursor over its payload.
#[derive(Debug)]
pub struct InPacket {
    opcode: OpCode,
    payload: Vec<u8>,
    position: usize,
}

impl InPacket {
    pub fn new(opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            payload,
            position: 0,
        }
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Total payload length, independent of the cursor.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes left in front of the cursor.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.position
    }

    fn take(&mut self, len: usize) -> Result<&[u8], CursorError> {
        if self.remaining() < len {
            return Err(CursorError::UnexpectedEnd {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&self.payload[start..self.position])
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], CursorError> {
        self.take(len)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CursorError> {
        self.take(len).map(|_| ())
    }

    /// Read a NUL-terminated string, consuming the terminator.
    ///
    /// Server strings are not guaranteed to be valid UTF-8, so bad bytes
    /// are replaced rather than rejected.
    pub fn read_cstring(&mut self) -> Result<String, CursorError> {
        let start = self.position;
        match self.payload[start..].iter().position(|&b| b == 0) {
            Some(nul) => {
                let text = String::from_utf8_lossy(&self.payload[start..start + nul]).into_owned();
                self.position = start + nul + 1;
                Ok(text)
            }
            None => Err(CursorError::UnterminatedString),
        }
    }

    /// Read a variable-length object id: a mask byte, then one byte per set
    /// mask bit, low byte first.
    pub fn read_packed_guid(&mut self) -> Result<u64, CursorError> {
        let mask = self.read_u8()?;
        let mut guid = 0u64;
        for bit in 0..8 {
            if mask & (1 << bit) != 0 {
                guid |= u64::from(self.read_u8()?) << (bit * 8);
            }
        }
        Ok(guid)
    }
}

// ----------------------------------------------------------------------------
// Outbound Packet
// ----------------------------------------------------------------------------

/// An outgoing frame under construction. All fields are little-endian.
#[derive(Debug)]
pub struct OutPacket {
    opcode: OpCode,
    body: Vec<u8>,
}

impl OutPacket {
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            body: Vec::new(),
        }
    }

    pub fn with_capacity(opcode: OpCode, capacity: usize) -> Self {
        Self {
            opcode,
            body: Vec::with_capacity(capacity),
        }
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Payload length so far, header not included.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.body.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Write the string bytes followed by a NUL terminator.
    pub fn write_cstring(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
        self.body.push(0);
    }

    /// Assemble the full wire frame and encrypt the header region in place.
    pub fn finalize(&self, cipher: &mut HeaderCipher) -> Result<Vec<u8>, FrameError> {
        let header = ClientHeader {
            opcode: self.opcode,
            payload_len: self.body.len(),
        }
        .encode()?;

        let mut frame = Vec::with_capacity(ClientHeader::LEN + self.body.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&self.body);
        cipher.apply(&mut frame[..ClientHeader::LEN]);
        Ok(frame)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
