//! Shared fixtures for handler and session tests
//!
//! Builds a live context over an in-memory pipe so tests can call handlers
//! directly and read whatever frames they send off the far end.

use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::time::timeout;
use worldlink_core::{Connection, InPacket, OpCode, SessionKey};

use crate::config::{AccountConfig, CharacterConfig, ChatConfig, ClientConfig, ServerConfig};
use crate::game::GameContext;
use crate::world::Character;

pub const SESSION_KEY_HEX: &str =
    "1B5A8D2E7C4F90A1B2C3D4E5F60718293A4B5C6D7E8F9012B3C4D5E6F7A8B9C0D1E2F3A4B5C6D7E8";

pub struct Harness {
    pub context: GameContext,
    pub connection: Connection,
    pub server: DuplexStream,
}

pub fn sample_config() -> ClientConfig {
    ClientConfig {
        server: ServerConfig {
            address: "localhost:8085".into(),
            realm_id: 1,
        },
        account: AccountConfig {
            name: "tester".into(),
            session_key: SESSION_KEY_HEX.into(),
        },
        character: CharacterConfig::default(),
        chat: ChatConfig::default(),
    }
}

/// A context wired to a connection over an in-memory pipe. Must be called
/// from within a tokio runtime.
pub fn harness() -> Harness {
    let (client, server) = tokio::io::duplex(4096);
    let (read_half, write_half) = tokio::io::split(client);
    let connection = Connection::spawn(read_half, write_half);
    let key = SessionKey::from_str(SESSION_KEY_HEX).unwrap();
    let context = GameContext::new(sample_config(), key, connection.sender());
    Harness {
        context,
        connection,
        server,
    }
}

pub fn sample_character() -> Character {
    Character {
        guid: 0x600,
        name: "Ohgren".into(),
        race: 2,
        class: 7,
        gender: 0,
        level: 80,
        zone_id: 1637,
        map_id: 1,
        guild_id: 21,
    }
}

/// Mark the context as standing in the world.
pub fn enter_world(context: &mut GameContext) {
    context.world.player = Some(sample_character());
}

pub fn in_packet(opcode: OpCode, payload: &[u8]) -> InPacket {
    InPacket::new(opcode, payload.to_vec())
}

/// Read one client frame off the pipe and split it into command and payload.
/// Headers are expected in the clear; activate no cipher in tests using this.
pub async fn read_client_frame(stream: &mut DuplexStream) -> (u16, Vec<u8>) {
    let mut header = [0u8; 6];
    timeout(Duration::from_secs(1), stream.read_exact(&mut header))
        .await
        .expect("header read timed out")
        .expect("header read failed");

    let size = u16::from_be_bytes([header[0], header[1]]) as usize;
    let opcode = u16::from_le_bytes([header[2], header[3]]);
    let mut payload = vec![0u8; size - 4];
    timeout(Duration::from_secs(1), stream.read_exact(&mut payload))
        .await
        .expect("payload read timed out")
        .expect("payload read failed");
    (opcode, payload)
}
