//! Session establishment and character entry
//!
//! Answers the server's session challenge with the account proof, walks the
//! verdict, requests the character list, and enters the world with the
//! configured character. The session key itself comes from configuration;
//! nothing here derives keys.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::io::Write;
use tracing::{debug, info, warn};
use worldlink_core::{opcodes, InPacket, OutPacket, Result};

use crate::game::{GameContext, GameEvent};
use crate::world::{class_name, race_name, Character};

const CLIENT_BUILD: u32 = 12340;

const AUTH_OK: u8 = 12;
const AUTH_WAIT_QUEUE: u8 = 27;

// ----------------------------------------------------------------------------
// Challenge and Proof
// ----------------------------------------------------------------------------

pub fn handle_auth_challenge(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    packet.skip(4)?;
    let server_seed = packet.read_u32()?;
    debug!("Session challenge received, seed 0x{:08X}", server_seed);

    let account = context.config.account.name.to_uppercase();
    let proof = session_proof(
        &account,
        context.client_seed,
        server_seed,
        context.session_key.as_bytes(),
    );

    let mut response = OutPacket::new(opcodes::CMSG_AUTH_SESSION);
    response.write_u32(CLIENT_BUILD);
    response.write_u32(0); // login server id
    response.write_cstring(&account);
    response.write_u32(0); // login server type
    response.write_u32(context.client_seed);
    response.write_u32(0); // region
    response.write_u32(0); // battlegroup
    response.write_u32(context.config.server.realm_id);
    response.write_u64(0); // DoS response
    response.write_bytes(&proof);
    response.write_bytes(&addon_block()?);
    context.send(response)?;

    // Every frame after the proof travels with an encrypted header, and the
    // server encrypts from its verdict onward.
    context.enable_encryption()
}

fn session_proof(
    account: &str,
    client_seed: u32,
    server_seed: u32,
    session_key: &[u8],
) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(account.as_bytes());
    hasher.update([0u8; 4]);
    hasher.update(client_seed.to_le_bytes());
    hasher.update(server_seed.to_le_bytes());
    hasher.update(session_key);
    hasher.finalize().into()
}

/// Compressed addon manifest trailing the session proof. This client carries
/// no addons, so the list is empty: a count of zero and a zero ban
/// timestamp, deflated behind the uncompressed-size prefix.
fn addon_block() -> std::io::Result<Vec<u8>> {
    let mut clear = Vec::new();
    clear.extend_from_slice(&0u32.to_le_bytes());
    clear.extend_from_slice(&0u32.to_le_bytes());

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&clear)?;
    let compressed = encoder.finish()?;

    let mut block = Vec::with_capacity(4 + compressed.len());
    block.extend_from_slice(&(clear.len() as u32).to_le_bytes());
    block.extend_from_slice(&compressed);
    Ok(block)
}

// ----------------------------------------------------------------------------
// Verdict
// ----------------------------------------------------------------------------

pub fn handle_auth_response(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let code = packet.read_u8()?;
    match code {
        AUTH_OK => {
            info!("Session accepted, requesting character list");
            context.send(OutPacket::new(opcodes::CMSG_CHAR_ENUM))
        }
        AUTH_WAIT_QUEUE => {
            let position = packet.read_u32()?;
            info!("Waiting in login queue at position {}", position);
            Ok(())
        }
        code => {
            warn!("Session refused: {}", auth_failure_reason(code));
            context.push_event(GameEvent::LoginFailed(auth_failure_reason(code)));
            Ok(())
        }
    }
}

fn auth_failure_reason(code: u8) -> String {
    match code {
        13 => "authentication failed".into(),
        14 => "rejected by the server".into(),
        16 => "server unavailable".into(),
        21 => "unknown account".into(),
        22 => "incorrect password".into(),
        23 => "session expired".into(),
        _ => format!("authentication rejected (code {code})"),
    }
}

// ----------------------------------------------------------------------------
// Character List
// ----------------------------------------------------------------------------

const EQUIPMENT_SLOTS: usize = 23;

pub fn handle_char_enum(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let count = packet.read_u8()?;
    let mut characters = Vec::with_capacity(count as usize);
    for _ in 0..count {
        characters.push(read_character(packet)?);
    }

    println!("Characters on this account:");
    for character in &characters {
        println!(
            "  {}, L{} {} {}",
            character.name,
            character.level,
            class_name(character.class),
            race_name(character.race)
        );
    }

    let chosen = match &context.config.character.name {
        Some(name) => characters.iter().find(|c| c.name.eq_ignore_ascii_case(name)),
        None => characters.first(),
    };

    match chosen {
        Some(character) => {
            info!("Logging in as {}", character.name);
            let mut login = OutPacket::new(opcodes::CMSG_PLAYER_LOGIN);
            login.write_u64(character.guid);
            context.send(login)?;
            context.world.player = Some(character.clone());
        }
        None => {
            let wanted = context.config.character.name.as_deref().unwrap_or("any");
            context.push_event(GameEvent::LoginFailed(format!(
                "no character named '{wanted}' on this account"
            )));
        }
    }

    context.world.characters = characters;
    Ok(())
}

fn read_character(packet: &mut InPacket) -> Result<Character> {
    let guid = packet.read_u64()?;
    let name = packet.read_cstring()?;
    let race = packet.read_u8()?;
    let class = packet.read_u8()?;
    let gender = packet.read_u8()?;
    packet.skip(5)?; // appearance
    let level = packet.read_u8()?;
    let zone_id = packet.read_u32()?;
    let map_id = packet.read_u32()?;
    packet.skip(12)?; // position
    let guild_id = packet.read_u32()?;
    packet.skip(4)?; // character flags
    packet.skip(4)?; // customization flags
    packet.skip(1)?; // first login
    packet.skip(12)?; // pet display, level, family
    packet.skip(EQUIPMENT_SLOTS * 9)?; // display id, inventory type, enchant

    Ok(Character {
        guid,
        name,
        race,
        class,
        gender,
        level,
        zone_id,
        map_id,
        guild_id,
    })
}

// ----------------------------------------------------------------------------
// World Entry
// ----------------------------------------------------------------------------

pub fn handle_login_verify_world(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let map_id = packet.read_u32()?;
    let x = packet.read_f32()?;
    let y = packet.read_f32()?;
    let z = packet.read_f32()?;
    let _orientation = packet.read_f32()?;

    info!("Entered map {} at ({:.1}, {:.1}, {:.1})", map_id, x, y, z);
    context.push_event(GameEvent::EnteredWorld);
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn challenge_packet(server_seed: u32) -> InPacket {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&server_seed.to_le_bytes());
        payload.extend_from_slice(&[0u8; 32]);
        testing::in_packet(opcodes::SMSG_AUTH_CHALLENGE, &payload)
    }

    fn character_record(guid: u64, name: &str, race: u8, class: u8, level: u8) -> Vec<u8> {
        let mut record = Vec::new();
        record.extend_from_slice(&guid.to_le_bytes());
        record.extend_from_slice(name.as_bytes());
        record.push(0);
        record.push(race);
        record.push(class);
        record.push(0); // gender
        record.extend_from_slice(&[0u8; 5]);
        record.push(level);
        record.extend_from_slice(&1637u32.to_le_bytes());
        record.extend_from_slice(&1u32.to_le_bytes());
        record.extend_from_slice(&[0u8; 12]);
        record.extend_from_slice(&21u32.to_le_bytes());
        record.extend_from_slice(&[0u8; 21]);
        record.extend_from_slice(&[0u8; EQUIPMENT_SLOTS * 9]);
        record
    }

    #[tokio::test]
    async fn challenge_answer_carries_account_and_proof() {
        let mut harness = testing::harness();
        let mut packet = challenge_packet(0xDEAD_BEEF);

        handle_auth_challenge(&mut harness.context, &mut packet).unwrap();

        let (opcode, payload) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_AUTH_SESSION.value());

        let mut reply = testing::in_packet(opcodes::CMSG_AUTH_SESSION, &payload);
        assert_eq!(reply.read_u32().unwrap(), CLIENT_BUILD);
        assert_eq!(reply.read_u32().unwrap(), 0);
        assert_eq!(reply.read_cstring().unwrap(), "TESTER");
        assert_eq!(reply.read_u32().unwrap(), 0);
        assert_eq!(reply.read_u32().unwrap(), harness.context.client_seed);
        assert_eq!(reply.read_u32().unwrap(), 0);
        assert_eq!(reply.read_u32().unwrap(), 0);
        assert_eq!(reply.read_u32().unwrap(), 1);
        assert_eq!(reply.read_u64().unwrap(), 0);

        let expected = session_proof(
            "TESTER",
            harness.context.client_seed,
            0xDEAD_BEEF,
            harness.context.session_key.as_bytes(),
        );
        assert_eq!(reply.read_bytes(20).unwrap(), &expected[..]);

        // Trailing addon manifest: size prefix plus a zlib stream holding an
        // empty list.
        let clear_len = reply.read_u32().unwrap() as usize;
        let compressed = reply.read_bytes(reply.remaining()).unwrap();
        let mut clear = Vec::new();
        ZlibDecoder::new(compressed).read_to_end(&mut clear).unwrap();
        assert_eq!(clear.len(), clear_len);
        assert_eq!(clear, [0u8; 8]);
    }

    #[tokio::test]
    async fn accepted_session_requests_the_character_list() {
        let mut harness = testing::harness();
        let mut packet = testing::in_packet(opcodes::SMSG_AUTH_RESPONSE, &[AUTH_OK]);

        handle_auth_response(&mut harness.context, &mut packet).unwrap();

        let (opcode, payload) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_CHAR_ENUM.value());
        assert!(payload.is_empty());
        assert!(harness.context.take_events().is_empty());
    }

    #[tokio::test]
    async fn queue_position_is_not_a_failure() {
        let mut harness = testing::harness();
        let mut payload = vec![AUTH_WAIT_QUEUE];
        payload.extend_from_slice(&14u32.to_le_bytes());
        let mut packet = testing::in_packet(opcodes::SMSG_AUTH_RESPONSE, &payload);

        handle_auth_response(&mut harness.context, &mut packet).unwrap();
        assert!(harness.context.take_events().is_empty());
    }

    #[tokio::test]
    async fn refused_session_reports_login_failure() {
        let mut harness = testing::harness();
        let mut packet = testing::in_packet(opcodes::SMSG_AUTH_RESPONSE, &[21]);

        handle_auth_response(&mut harness.context, &mut packet).unwrap();

        let events = harness.context.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            GameEvent::LoginFailed(reason) if reason.contains("unknown account")
        ));
    }

    #[tokio::test]
    async fn the_configured_character_enters_the_world() {
        let mut harness = testing::harness();
        harness.context.config.character.name = Some("second".into());

        let mut payload = vec![2u8];
        payload.extend_from_slice(&character_record(0x100, "First", 1, 1, 70));
        payload.extend_from_slice(&character_record(0x200, "Second", 2, 7, 80));
        let mut packet = testing::in_packet(opcodes::SMSG_CHAR_ENUM, &payload);

        handle_char_enum(&mut harness.context, &mut packet).unwrap();

        let (opcode, login) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_PLAYER_LOGIN.value());
        assert_eq!(login, 0x200u64.to_le_bytes());

        assert_eq!(harness.context.world.characters.len(), 2);
        let player = harness.context.world.player.as_ref().unwrap();
        assert_eq!(player.name, "Second");
        assert_eq!(player.guild_id, 21);
    }

    #[tokio::test]
    async fn a_missing_character_fails_the_login() {
        let mut harness = testing::harness();
        harness.context.config.character.name = Some("Nobody".into());

        let mut payload = vec![1u8];
        payload.extend_from_slice(&character_record(0x100, "First", 1, 1, 70));
        let mut packet = testing::in_packet(opcodes::SMSG_CHAR_ENUM, &payload);

        handle_char_enum(&mut harness.context, &mut packet).unwrap();

        let events = harness.context.take_events();
        assert!(matches!(
            &events[0],
            GameEvent::LoginFailed(reason) if reason.contains("Nobody")
        ));
    }

    #[tokio::test]
    async fn world_entry_raises_the_entered_event() {
        let mut harness = testing::harness();
        let mut payload = Vec::new();
        payload.extend_from_slice(&571u32.to_le_bytes());
        for coordinate in [5807.8f32, 588.0, 661.0, 3.1] {
            payload.extend_from_slice(&coordinate.to_le_bytes());
        }
        let mut packet = testing::in_packet(opcodes::SMSG_LOGIN_VERIFY_WORLD, &payload);

        handle_login_verify_world(&mut harness.context, &mut packet).unwrap();
        assert_eq!(harness.context.take_events(), vec![GameEvent::EnteredWorld]);
    }
}
