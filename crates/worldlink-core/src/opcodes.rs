//! World-protocol command constants (3.3.5a, build 12340)
//!
//! Only the commands this client sends or inspects are listed; anything
//! else is still dispatchable by raw value.

use crate::types::OpCode;

pub const CMSG_CHAR_ENUM: OpCode = OpCode::new(0x0037);
pub const SMSG_CHAR_ENUM: OpCode = OpCode::new(0x003B);
pub const CMSG_PLAYER_LOGIN: OpCode = OpCode::new(0x003D);
pub const CMSG_LOGOUT_REQUEST: OpCode = OpCode::new(0x004B);
pub const SMSG_LOGOUT_RESPONSE: OpCode = OpCode::new(0x004C);
pub const SMSG_LOGOUT_COMPLETE: OpCode = OpCode::new(0x004D);
pub const CMSG_NAME_QUERY: OpCode = OpCode::new(0x0050);
pub const SMSG_NAME_QUERY_RESPONSE: OpCode = OpCode::new(0x0051);
pub const CMSG_GUILD_QUERY: OpCode = OpCode::new(0x0054);
pub const SMSG_GUILD_QUERY_RESPONSE: OpCode = OpCode::new(0x0055);
pub const CMSG_GUILD_ROSTER: OpCode = OpCode::new(0x0089);
pub const SMSG_GUILD_ROSTER: OpCode = OpCode::new(0x008A);
pub const SMSG_GUILD_EVENT: OpCode = OpCode::new(0x0092);
pub const CMSG_MESSAGECHAT: OpCode = OpCode::new(0x0095);
pub const SMSG_MESSAGECHAT: OpCode = OpCode::new(0x0096);
pub const CMSG_JOIN_CHANNEL: OpCode = OpCode::new(0x0097);
pub const CMSG_LEAVE_CHANNEL: OpCode = OpCode::new(0x0098);
pub const SMSG_CHANNEL_NOTIFY: OpCode = OpCode::new(0x0099);
pub const SMSG_UPDATE_OBJECT: OpCode = OpCode::new(0x00A9);
pub const SMSG_DESTROY_OBJECT: OpCode = OpCode::new(0x00AA);
pub const SMSG_MONSTER_MOVE: OpCode = OpCode::new(0x00DD);
pub const SMSG_TUTORIAL_FLAGS: OpCode = OpCode::new(0x00FD);
pub const SMSG_NOTIFICATION: OpCode = OpCode::new(0x01CB);
pub const CMSG_PING: OpCode = OpCode::new(0x01DC);
pub const SMSG_PONG: OpCode = OpCode::new(0x01DD);
pub const SMSG_AUTH_CHALLENGE: OpCode = OpCode::new(0x01EC);
pub const CMSG_AUTH_SESSION: OpCode = OpCode::new(0x01ED);
pub const SMSG_AUTH_RESPONSE: OpCode = OpCode::new(0x01EE);
pub const SMSG_COMPRESSED_UPDATE_OBJECT: OpCode = OpCode::new(0x01F6);
pub const SMSG_ACCOUNT_DATA_TIMES: OpCode = OpCode::new(0x0209);
pub const SMSG_LOGIN_VERIFY_WORLD: OpCode = OpCode::new(0x0236);
pub const SMSG_SERVER_MESSAGE: OpCode = OpCode::new(0x0291);
pub const SMSG_CHAT_PLAYER_NOT_FOUND: OpCode = OpCode::new(0x02A9);
pub const SMSG_WEATHER: OpCode = OpCode::new(0x02F4);
pub const SMSG_MOTD: OpCode = OpCode::new(0x033D);
pub const SMSG_TIME_SYNC_REQ: OpCode = OpCode::new(0x0390);
pub const CMSG_TIME_SYNC_RESP: OpCode = OpCode::new(0x0391);
pub const SMSG_GM_MESSAGECHAT: OpCode = OpCode::new(0x03B3);
pub const CMSG_KEEP_ALIVE: OpCode = OpCode::new(0x0407);
pub const SMSG_POWER_UPDATE: OpCode = OpCode::new(0x0480);

/// Command name for logging, for the commands this crate knows about.
pub fn name(opcode: OpCode) -> Option<&'static str> {
    Some(match opcode {
        CMSG_CHAR_ENUM => "CMSG_CHAR_ENUM",
        SMSG_CHAR_ENUM => "SMSG_CHAR_ENUM",
        CMSG_PLAYER_LOGIN => "CMSG_PLAYER_LOGIN",
        CMSG_LOGOUT_REQUEST => "CMSG_LOGOUT_REQUEST",
        SMSG_LOGOUT_RESPONSE => "SMSG_LOGOUT_RESPONSE",
        SMSG_LOGOUT_COMPLETE => "SMSG_LOGOUT_COMPLETE",
        CMSG_NAME_QUERY => "CMSG_NAME_QUERY",
        SMSG_NAME_QUERY_RESPONSE => "SMSG_NAME_QUERY_RESPONSE",
        CMSG_GUILD_QUERY => "CMSG_GUILD_QUERY",
        SMSG_GUILD_QUERY_RESPONSE => "SMSG_GUILD_QUERY_RESPONSE",
        CMSG_GUILD_ROSTER => "CMSG_GUILD_ROSTER",
        SMSG_GUILD_ROSTER => "SMSG_GUILD_ROSTER",
        SMSG_GUILD_EVENT => "SMSG_GUILD_EVENT",
        CMSG_MESSAGECHAT => "CMSG_MESSAGECHAT",
        SMSG_MESSAGECHAT => "SMSG_MESSAGECHAT",
        CMSG_JOIN_CHANNEL => "CMSG_JOIN_CHANNEL",
        CMSG_LEAVE_CHANNEL => "CMSG_LEAVE_CHANNEL",
        SMSG_CHANNEL_NOTIFY => "SMSG_CHANNEL_NOTIFY",
        SMSG_UPDATE_OBJECT => "SMSG_UPDATE_OBJECT",
        SMSG_DESTROY_OBJECT => "SMSG_DESTROY_OBJECT",
        SMSG_MONSTER_MOVE => "SMSG_MONSTER_MOVE",
        SMSG_TUTORIAL_FLAGS => "SMSG_TUTORIAL_FLAGS",
        SMSG_NOTIFICATION => "SMSG_NOTIFICATION",
        CMSG_PING => "CMSG_PING",
        SMSG_PONG => "SMSG_PONG",
        SMSG_AUTH_CHALLENGE => "SMSG_AUTH_CHALLENGE",
        CMSG_AUTH_SESSION => "CMSG_AUTH_SESSION",
        SMSG_AUTH_RESPONSE => "SMSG_AUTH_RESPONSE",
        SMSG_COMPRESSED_UPDATE_OBJECT => "SMSG_COMPRESSED_UPDATE_OBJECT",
        SMSG_ACCOUNT_DATA_TIMES => "SMSG_ACCOUNT_DATA_TIMES",
        SMSG_LOGIN_VERIFY_WORLD => "SMSG_LOGIN_VERIFY_WORLD",
        SMSG_SERVER_MESSAGE => "SMSG_SERVER_MESSAGE",
        SMSG_CHAT_PLAYER_NOT_FOUND => "SMSG_CHAT_PLAYER_NOT_FOUND",
        SMSG_WEATHER => "SMSG_WEATHER",
        SMSG_MOTD => "SMSG_MOTD",
        SMSG_TIME_SYNC_REQ => "SMSG_TIME_SYNC_REQ",
        CMSG_TIME_SYNC_RESP => "CMSG_TIME_SYNC_RESP",
        SMSG_GM_MESSAGECHAT => "SMSG_GM_MESSAGECHAT",
        CMSG_KEEP_ALIVE => "CMSG_KEEP_ALIVE",
        SMSG_POWER_UPDATE => "SMSG_POWER_UPDATE",
        _ => return None,
    })
}
