//! Opcode handler registry
//!
//! Each handler module contributes its table here. Registration happens once
//! when the session starts; later registrations for the same command would
//! replace earlier ones.

pub mod auth;
pub mod chat;
pub mod guild;
pub mod misc;

use worldlink_core::{opcodes, Dispatcher};

use crate::game::GameContext;

/// Wire every handler and seed the suppression set.
pub fn register_all(dispatcher: &mut Dispatcher<GameContext>) {
    dispatcher.register(opcodes::SMSG_AUTH_CHALLENGE, auth::handle_auth_challenge);
    dispatcher.register(opcodes::SMSG_AUTH_RESPONSE, auth::handle_auth_response);
    dispatcher.register(opcodes::SMSG_CHAR_ENUM, auth::handle_char_enum);
    dispatcher.register(
        opcodes::SMSG_LOGIN_VERIFY_WORLD,
        auth::handle_login_verify_world,
    );

    dispatcher.register(opcodes::SMSG_MESSAGECHAT, chat::handle_message_chat);
    dispatcher.register(opcodes::SMSG_GM_MESSAGECHAT, chat::handle_gm_message_chat);
    dispatcher.register(
        opcodes::SMSG_NAME_QUERY_RESPONSE,
        chat::handle_name_query_response,
    );
    dispatcher.register(opcodes::SMSG_CHANNEL_NOTIFY, chat::handle_channel_notify);
    dispatcher.register(opcodes::SMSG_NOTIFICATION, chat::handle_notification);
    dispatcher.register(opcodes::SMSG_MOTD, chat::handle_motd);
    dispatcher.register(opcodes::SMSG_SERVER_MESSAGE, chat::handle_server_message);
    dispatcher.register(
        opcodes::SMSG_CHAT_PLAYER_NOT_FOUND,
        chat::handle_chat_player_not_found,
    );

    dispatcher.register(
        opcodes::SMSG_GUILD_QUERY_RESPONSE,
        guild::handle_guild_query_response,
    );
    dispatcher.register(opcodes::SMSG_GUILD_ROSTER, guild::handle_guild_roster);
    dispatcher.register(opcodes::SMSG_GUILD_EVENT, guild::handle_guild_event);

    dispatcher.register(opcodes::SMSG_PONG, misc::handle_pong);
    dispatcher.register(opcodes::SMSG_TIME_SYNC_REQ, misc::handle_time_sync);
    dispatcher.register(opcodes::SMSG_LOGOUT_RESPONSE, misc::handle_logout_response);
    dispatcher.register(opcodes::SMSG_LOGOUT_COMPLETE, misc::handle_logout_complete);

    // High-volume world state this client has no use for.
    for opcode in [
        opcodes::SMSG_UPDATE_OBJECT,
        opcodes::SMSG_COMPRESSED_UPDATE_OBJECT,
        opcodes::SMSG_DESTROY_OBJECT,
        opcodes::SMSG_MONSTER_MOVE,
        opcodes::SMSG_TUTORIAL_FLAGS,
        opcodes::SMSG_ACCOUNT_DATA_TIMES,
        opcodes::SMSG_WEATHER,
        opcodes::SMSG_POWER_UPDATE,
    ] {
        dispatcher.silence(opcode);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
