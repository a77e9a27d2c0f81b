//! Frame-header encryption
//!
//! After authentication the server encrypts every frame header it sends and
//! expects every header it receives to be encrypted; payloads stay plain.
//! Each direction runs an independent ARC4 stream whose key is derived from
//! the session key with HMAC-SHA1 under a direction-specific seed, and both
//! streams discard their first 1024 keystream bytes before use.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::CryptError;
use crate::types::SessionKey;

type HmacSha1 = Hmac<Sha1>;

/// Keystream bytes discarded after key setup.
const DROP_BYTES: usize = 1024;

/// Seed for the client-to-server header stream.
const SEND_SEED: [u8; 16] = [
    0xC2, 0xB3, 0x72, 0x3C, 0xC6, 0xAE, 0xD9, 0xB5, 0x34, 0x3C, 0x53, 0xEE, 0x2F, 0x43, 0x67,
    0xCE,
];

/// Seed for the server-to-client header stream.
const RECV_SEED: [u8; 16] = [
    0xCC, 0x98, 0xAE, 0x04, 0xE8, 0x97, 0xEA, 0xCA, 0x12, 0xDD, 0xC0, 0x93, 0x42, 0x91, 0x53,
    0x57,
];

// ----------------------------------------------------------------------------
// ARC4 Stream
// ----------------------------------------------------------------------------

/// Plain ARC4 keystream generator.
struct Arc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arc4 {
    fn new(key: &[u8]) -> Self {
        let mut state = [0u8; 256];
        for (n, byte) in state.iter_mut().enumerate() {
            *byte = n as u8;
        }
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }
        Self { state, i: 0, j: 0 }
    }

    fn next_keystream_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);
        let sum = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[sum as usize]
    }

    fn apply(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte ^= self.next_keystream_byte();
        }
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.next_keystream_byte();
        }
    }
}

// ----------------------------------------------------------------------------
// Header Cipher
// ----------------------------------------------------------------------------

/// One direction of the header crypt.
///
/// Starts inactive, where [`HeaderCipher::apply`] leaves bytes untouched.
/// The handshake runs in the clear, so both sides switch their streams on
/// only once the authentication frame is on the wire.
pub struct HeaderCipher {
    inner: Option<Arc4>,
}

impl HeaderCipher {
    /// A cipher that passes headers through unchanged.
    pub fn inactive() -> Self {
        Self { inner: None }
    }

    fn with_key(key: &[u8]) -> Self {
        let mut stream = Arc4::new(key);
        stream.skip(DROP_BYTES);
        Self {
            inner: Some(stream),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Transform `header` in place, advancing the keystream by its length.
    pub fn apply(&mut self, header: &mut [u8]) {
        if let Some(stream) = &mut self.inner {
            stream.apply(header);
        }
    }
}

// ----------------------------------------------------------------------------
// Key Derivation
// ----------------------------------------------------------------------------

/// The send and receive header streams for one session.
pub struct CipherPair {
    pub send: HeaderCipher,
    pub recv: HeaderCipher,
}

impl CipherPair {
    /// Derive both direction streams from the session key.
    pub fn from_session_key(session_key: &SessionKey) -> Result<Self, CryptError> {
        Ok(Self {
            send: HeaderCipher::with_key(&derive_key(&SEND_SEED, session_key)?),
            recv: HeaderCipher::with_key(&derive_key(&RECV_SEED, session_key)?),
        })
    }
}

fn derive_key(seed: &[u8; 16], session_key: &SessionKey) -> Result<[u8; 20], CryptError> {
    let mut mac =
        HmacSha1::new_from_slice(seed).map_err(|_| CryptError::KeyDerivationFailed)?;
    mac.update(session_key.as_bytes());
    Ok(mac.finalize().into_bytes().into())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
