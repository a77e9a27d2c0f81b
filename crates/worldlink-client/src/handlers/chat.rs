//! Chat traffic in both directions
//!
//! Decodes server chat frames, resolves sender names through the name-query
//! round trip, and presents messages on the console. Messages from senders
//! whose names are unknown wait in the world state until the query answer
//! releases them. Outbound chat builders live here too so the command layer
//! and the handlers share one wire encoding.

use tracing::{debug, warn};
use worldlink_core::{opcodes, InPacket, OutPacket, Result};

use crate::game::GameContext;
use crate::world::{ChatMessage, ChatMessageType, ChatTag, Language};

// ----------------------------------------------------------------------------
// Inbound Messages
// ----------------------------------------------------------------------------

pub fn handle_message_chat(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    if let Some(message) = read_chat_message(packet, false)? {
        deliver(context, message)?;
    }
    Ok(())
}

pub fn handle_gm_message_chat(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    if let Some(message) = read_chat_message(packet, true)? {
        deliver(context, message)?;
    }
    Ok(())
}

/// Decode one chat frame. GM frames and monster chatter carry the sender
/// name inline; everything else references the sender by GUID only.
pub(crate) fn read_chat_message(
    packet: &mut InPacket,
    gm_variant: bool,
) -> Result<Option<ChatMessage>> {
    let raw_kind = packet.read_u8()?;
    let Some(kind) = ChatMessageType::from_wire(raw_kind) else {
        debug!("Ignoring chat frame with unknown type 0x{:02X}", raw_kind);
        return Ok(None);
    };
    let language = Language(packet.read_u32()?);
    let sender_guid = packet.read_u64()?;
    packet.skip(4)?; // message flags

    let mut sender_name = String::new();
    if gm_variant || kind.has_inline_sender() {
        let length = packet.read_u32()? as usize;
        sender_name = sized_text(packet, length)?;
    }

    let channel = if kind == ChatMessageType::Channel {
        Some(packet.read_cstring()?)
    } else {
        None
    };

    let _target_guid = packet.read_u64()?;
    let length = packet.read_u32()? as usize;
    let text = sized_text(packet, length)?;
    let tag = ChatTag(packet.read_u8()?);

    Ok(Some(ChatMessage {
        kind,
        language,
        sender_guid,
        sender_name,
        channel,
        text,
        tag,
    }))
}

/// Length-prefixed text field; the length counts the trailing NUL.
fn sized_text(packet: &mut InPacket, length: usize) -> Result<String> {
    let bytes = packet.read_bytes(length)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Present a message right away when its sender is known, otherwise park it
/// behind a name query.
fn deliver(context: &mut GameContext, mut message: ChatMessage) -> Result<()> {
    let guid = message.sender_guid;

    if !message.sender_name.is_empty() || guid == 0 {
        present(context, &message);
        return Ok(());
    }
    if guid == context.world.player_guid() {
        if let Some(player) = &context.world.player {
            message.sender_name = player.name.clone();
        }
        present(context, &message);
        return Ok(());
    }
    if let Some(name) = context.world.player_name(guid) {
        message.sender_name = name.to_owned();
        present(context, &message);
        return Ok(());
    }

    if context.world.queue_chat_message(message) {
        send_name_query(context, guid)?;
    }
    Ok(())
}

/// Console presentation, one line per message. Addon traffic goes to the
/// debug log instead of the console.
fn present(context: &mut GameContext, message: &ChatMessage) {
    // The server repeats some system text with no sender attached.
    if message.kind == ChatMessageType::System && message.sender_name.is_empty() {
        return;
    }

    if message.kind == ChatMessageType::Whisper {
        context.world.note_whisperer(&message.sender_name);
    }

    let mut line = String::new();
    if message.kind == ChatMessageType::WhisperInform {
        line.push_str("To: ");
    } else {
        line.push_str(message.kind.label());
    }
    if let Some(channel) = &message.channel {
        line.push_str(" [");
        line.push_str(channel);
        line.push_str("] ");
    }
    line.push('[');
    if message.tag.contains(ChatTag::GM) {
        line.push_str("<GM>");
    }
    if message.tag.contains(ChatTag::AFK) {
        line.push_str("<AFK>");
    }
    if message.tag.contains(ChatTag::DND) {
        line.push_str("<DND>");
    }
    line.push_str(&message.sender_name);
    line.push_str("]: ");
    line.push_str(&message.text);

    if message.language.is_addon() {
        debug!("{}", line);
    } else {
        println!("{line}");
    }
}

// ----------------------------------------------------------------------------
// Name Queries
// ----------------------------------------------------------------------------

pub fn send_name_query(context: &GameContext, guid: u64) -> Result<()> {
    let mut query = OutPacket::new(opcodes::CMSG_NAME_QUERY);
    query.write_u64(guid);
    context.send(query)
}

pub fn handle_name_query_response(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let guid = packet.read_packed_guid()?;
    let unknown = packet.read_u8()?;
    if unknown != 0 {
        warn!("Name query for 0x{:X} came back empty", guid);
        return Ok(());
    }
    let name = packet.read_cstring()?;
    let _realm = packet.read_cstring()?;

    for message in context.world.resolve_player_name(guid, &name) {
        present(context, &message);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Server Text
// ----------------------------------------------------------------------------

pub fn handle_notification(_context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let text = packet.read_cstring()?;
    println!("Notification: {text}");
    Ok(())
}

pub fn handle_motd(_context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let lines = packet.read_u32()?;
    for _ in 0..lines {
        println!("MOTD: {}", packet.read_cstring()?);
    }
    Ok(())
}

pub fn handle_server_message(_context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let _kind = packet.read_u32()?;
    let text = packet.read_cstring()?;
    println!("Server message: {text}");
    Ok(())
}

pub fn handle_chat_player_not_found(
    _context: &mut GameContext,
    packet: &mut InPacket,
) -> Result<()> {
    let name = packet.read_cstring()?;
    println!("No player named '{name}' is currently playing.");
    Ok(())
}

const CHANNEL_YOU_JOINED: u8 = 0x02;
const CHANNEL_YOU_LEFT: u8 = 0x03;
const CHANNEL_WRONG_PASSWORD: u8 = 0x04;

pub fn handle_channel_notify(_context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let notice = packet.read_u8()?;
    let channel = packet.read_cstring()?;
    match notice {
        CHANNEL_YOU_JOINED => println!("Joined channel [{channel}]."),
        CHANNEL_YOU_LEFT => println!("Left channel [{channel}]."),
        CHANNEL_WRONG_PASSWORD => warn!("Wrong password for channel [{}]", channel),
        other => debug!("Channel notice 0x{:02X} for [{}]", other, channel),
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Outbound Chat
// ----------------------------------------------------------------------------

/// Say, yell, guild, or whisper in the character's faction language.
/// Whispers name their target; the other kinds broadcast.
pub fn send_chat(
    context: &GameContext,
    kind: ChatMessageType,
    target: Option<&str>,
    text: &str,
) -> Result<()> {
    let language = match &context.world.player {
        Some(player) => player.language(),
        None => Language::UNIVERSAL,
    };

    let mut packet = OutPacket::new(opcodes::CMSG_MESSAGECHAT);
    packet.write_u32(kind.to_wire());
    packet.write_u32(language.0);
    if let Some(target) = target {
        packet.write_cstring(target);
    }
    packet.write_cstring(text);
    context.send(packet)
}

pub fn join_channel(context: &GameContext, channel: &str) -> Result<()> {
    let mut packet = OutPacket::new(opcodes::CMSG_JOIN_CHANNEL);
    packet.write_u32(0); // channel id, zero for named channels
    packet.write_u8(0); // no voice
    packet.write_u8(0); // not from zone update
    packet.write_cstring(channel);
    packet.write_cstring(""); // password
    context.send(packet)
}

pub fn leave_channel(context: &GameContext, channel: &str) -> Result<()> {
    let mut packet = OutPacket::new(opcodes::CMSG_LEAVE_CHANNEL);
    packet.write_u32(0);
    packet.write_cstring(channel);
    context.send(packet)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn chat_payload(
        kind: u8,
        language: u32,
        sender: u64,
        channel: Option<&str>,
        text: &str,
        tag: u8,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.push(kind);
        payload.extend_from_slice(&language.to_le_bytes());
        payload.extend_from_slice(&sender.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        if let Some(channel) = channel {
            payload.extend_from_slice(channel.as_bytes());
            payload.push(0);
        }
        payload.extend_from_slice(&0u64.to_le_bytes());
        payload.extend_from_slice(&(text.len() as u32 + 1).to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        payload.push(0);
        payload.push(tag);
        payload
    }

    #[test]
    fn channel_messages_decode_every_field() {
        let payload = chat_payload(0x11, 7, 0x42, Some("Trade"), "wts boots", 0x2);
        let mut packet = testing::in_packet(opcodes::SMSG_MESSAGECHAT, &payload);

        let message = read_chat_message(&mut packet, false).unwrap().unwrap();
        assert_eq!(message.kind, ChatMessageType::Channel);
        assert_eq!(message.language, Language::COMMON);
        assert_eq!(message.sender_guid, 0x42);
        assert_eq!(message.channel.as_deref(), Some("Trade"));
        assert_eq!(message.text, "wts boots");
        assert!(message.tag.contains(ChatTag::DND));
    }

    #[test]
    fn gm_frames_carry_the_sender_inline() {
        let mut payload = Vec::new();
        payload.push(0x01);
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&0x99u64.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&5u32.to_le_bytes());
        payload.extend_from_slice(b"Dave\0");
        payload.extend_from_slice(&0u64.to_le_bytes());
        payload.extend_from_slice(&6u32.to_le_bytes());
        payload.extend_from_slice(b"hello\0");
        payload.push(0x4);

        let mut packet = testing::in_packet(opcodes::SMSG_GM_MESSAGECHAT, &payload);
        let message = read_chat_message(&mut packet, true).unwrap().unwrap();
        assert_eq!(message.sender_name, "Dave");
        assert_eq!(message.text, "hello");
        assert!(message.tag.contains(ChatTag::GM));
    }

    #[test]
    fn unknown_chat_types_are_skipped() {
        let payload = chat_payload(0x7F, 0, 1, None, "??", 0);
        let mut packet = testing::in_packet(opcodes::SMSG_MESSAGECHAT, &payload);
        assert!(read_chat_message(&mut packet, false).unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_senders_trigger_one_name_query() {
        let mut harness = testing::harness();
        let payload = chat_payload(0x01, 7, 0x1234, None, "who am i", 0);

        let mut packet = testing::in_packet(opcodes::SMSG_MESSAGECHAT, &payload);
        handle_message_chat(&mut harness.context, &mut packet).unwrap();

        let (opcode, query) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_NAME_QUERY.value());
        assert_eq!(query, 0x1234u64.to_le_bytes());
    }

    #[tokio::test]
    async fn the_name_answer_releases_parked_whispers() {
        let mut harness = testing::harness();
        let payload = chat_payload(0x07, 7, 0x1234, None, "psst", 0);
        let mut packet = testing::in_packet(opcodes::SMSG_MESSAGECHAT, &payload);
        handle_message_chat(&mut harness.context, &mut packet).unwrap();

        // Nothing presented yet, so nobody is on the whisper list.
        assert!(harness.context.world.last_whisperer().is_none());

        let mut answer = Vec::new();
        answer.push(0x03); // packed guid mask, two low bytes
        answer.push(0x34);
        answer.push(0x12);
        answer.push(0); // found
        answer.extend_from_slice(b"Dax\0");
        answer.push(0); // realm
        answer.extend_from_slice(&[2, 0, 7]); // race, gender, class

        let mut packet = testing::in_packet(opcodes::SMSG_NAME_QUERY_RESPONSE, &answer);
        handle_name_query_response(&mut harness.context, &mut packet).unwrap();

        assert_eq!(harness.context.world.last_whisperer(), Some("Dax"));
        assert_eq!(harness.context.world.player_name(0x1234), Some("Dax"));
    }

    #[tokio::test]
    async fn whispers_name_their_target_on_the_wire() {
        let mut harness = testing::harness();
        testing::enter_world(&mut harness.context);

        send_chat(
            &harness.context,
            ChatMessageType::Whisper,
            Some("Dax"),
            "on my way",
        )
        .unwrap();

        let (opcode, payload) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_MESSAGECHAT.value());

        let mut sent = testing::in_packet(opcodes::CMSG_MESSAGECHAT, &payload);
        assert_eq!(sent.read_u32().unwrap(), 0x07);
        assert_eq!(sent.read_u32().unwrap(), Language::ORCISH.0);
        assert_eq!(sent.read_cstring().unwrap(), "Dax");
        assert_eq!(sent.read_cstring().unwrap(), "on my way");
    }

    #[tokio::test]
    async fn channel_join_uses_the_named_channel_form() {
        let mut harness = testing::harness();
        join_channel(&harness.context, "General").unwrap();

        let (opcode, payload) = testing::read_client_frame(&mut harness.server).await;
        assert_eq!(opcode, opcodes::CMSG_JOIN_CHANNEL.value());

        let mut sent = testing::in_packet(opcodes::CMSG_JOIN_CHANNEL, &payload);
        assert_eq!(sent.read_u32().unwrap(), 0);
        assert_eq!(sent.read_u8().unwrap(), 0);
        assert_eq!(sent.read_u8().unwrap(), 0);
        assert_eq!(sent.read_cstring().unwrap(), "General");
        assert_eq!(sent.read_cstring().unwrap(), "");
    }
}
