//! Frame header codec
//!
//! Server-to-client headers are variable length: a big-endian size followed
//! by a little-endian command value. When the high bit of the first byte is
//! set the size spans three bytes instead of two, which lets a frame carry
//! up to 8 MiB minus one. The size counts the command bytes plus the
//! payload, never itself. Client-to-server headers are fixed at six bytes
//! with the command widened to 32 bits.

use crate::error::FrameError;
use crate::types::OpCode;

/// High bit of the first header byte marks the three-byte size form.
pub const LARGE_FRAME_FLAG: u8 = 0x80;

/// Largest size the two-byte form can carry.
pub const SMALL_FRAME_MAX: u32 = 0x7FFF;

/// Largest size the three-byte form can carry.
pub const FRAME_SIZE_MAX: u32 = 0x7F_FFFF;

/// Smallest legal size: the two command bytes with an empty payload.
pub const FRAME_SIZE_MIN: u32 = 2;

// ----------------------------------------------------------------------------
// Server Header
// ----------------------------------------------------------------------------

/// Decoded server-to-client frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerHeader {
    pub opcode: OpCode,
    pub payload_len: usize,
}

impl ServerHeader {
    /// Number of header bytes on the wire, judged from the first byte alone.
    ///
    /// The first byte must already be decrypted; everything about the frame
    /// length hangs off its high bit.
    pub fn wire_len(first_byte: u8) -> usize {
        if first_byte & LARGE_FRAME_FLAG != 0 {
            5
        } else {
            4
        }
    }

    /// Decode a complete, already-decrypted header.
    ///
    /// `bytes` must be exactly [`ServerHeader::wire_len`] long for its own
    /// first byte.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        debug_assert_eq!(bytes.len(), Self::wire_len(bytes[0]));

        let (size, opcode) = if bytes[0] & LARGE_FRAME_FLAG != 0 {
            let size = u32::from(bytes[0] & !LARGE_FRAME_FLAG) << 16
                | u32::from(bytes[1]) << 8
                | u32::from(bytes[2]);
            (size, u16::from_le_bytes([bytes[3], bytes[4]]))
        } else {
            let size = u32::from(bytes[0]) << 8 | u32::from(bytes[1]);
            (size, u16::from_le_bytes([bytes[2], bytes[3]]))
        };

        if size < FRAME_SIZE_MIN {
            return Err(FrameError::SizeTooSmall {
                size,
                min: FRAME_SIZE_MIN,
            });
        }
        if size > FRAME_SIZE_MAX {
            return Err(FrameError::SizeTooLarge {
                size,
                max: FRAME_SIZE_MAX,
            });
        }

        Ok(Self {
            opcode: OpCode::new(opcode),
            payload_len: (size - FRAME_SIZE_MIN) as usize,
        })
    }

    /// Encode this header, picking the shortest form that fits.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let size = self.payload_len as u32 + FRAME_SIZE_MIN;
        if size > FRAME_SIZE_MAX {
            return Err(FrameError::SizeTooLarge {
                size,
                max: FRAME_SIZE_MAX,
            });
        }

        let opcode = self.opcode.value().to_le_bytes();
        let header = if size > SMALL_FRAME_MAX {
            vec![
                (size >> 16) as u8 | LARGE_FRAME_FLAG,
                (size >> 8) as u8,
                size as u8,
                opcode[0],
                opcode[1],
            ]
        } else {
            vec![(size >> 8) as u8, size as u8, opcode[0], opcode[1]]
        };
        Ok(header)
    }
}

// ----------------------------------------------------------------------------
// Client Header
// ----------------------------------------------------------------------------

/// Fixed-size client-to-server frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHeader {
    pub opcode: OpCode,
    pub payload_len: usize,
}

impl ClientHeader {
    pub const LEN: usize = 6;

    /// Largest payload the 16-bit size field can describe.
    pub const PAYLOAD_MAX: usize = u16::MAX as usize - 4;

    /// Encode as big-endian size over little-endian 32-bit command.
    ///
    /// The size counts the four command bytes plus the payload.
    pub fn encode(&self) -> Result<[u8; Self::LEN], FrameError> {
        if self.payload_len > Self::PAYLOAD_MAX {
            return Err(FrameError::PayloadTooLarge {
                payload: self.payload_len,
                max: Self::PAYLOAD_MAX,
            });
        }

        let size = (self.payload_len as u16 + 4).to_be_bytes();
        let opcode = u32::from(self.opcode.value()).to_le_bytes();
        Ok([size[0], size[1], opcode[0], opcode[1], opcode[2], opcode[3]])
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
