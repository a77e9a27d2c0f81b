//! World-state bookkeeping
//!
//! Names, guild information, and whisper history accumulated from server
//! frames over the lifetime of a session. Chat messages from senders whose
//! names are still unresolved wait here until the name query completes.

use std::collections::{HashMap, HashSet, VecDeque};

// ----------------------------------------------------------------------------
// Chat Definitions
// ----------------------------------------------------------------------------

/// Chat message categories (3.3.5a wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageType {
    System,
    Say,
    Party,
    Raid,
    Guild,
    Officer,
    Yell,
    Whisper,
    WhisperForeign,
    WhisperInform,
    Emote,
    TextEmote,
    MonsterSay,
    MonsterYell,
    MonsterEmote,
    Channel,
    ChannelJoin,
    ChannelLeave,
    ChannelNotice,
    Afk,
    Dnd,
    Ignored,
    Money,
    RaidLeader,
    RaidWarning,
    Achievement,
    GuildAchievement,
    PartyLeader,
}

impl ChatMessageType {
    pub fn from_wire(value: u8) -> Option<Self> {
        let kind = match value {
            0x00 => Self::System,
            0x01 => Self::Say,
            0x02 => Self::Party,
            0x03 => Self::Raid,
            0x04 => Self::Guild,
            0x05 => Self::Officer,
            0x06 => Self::Yell,
            0x07 => Self::Whisper,
            0x08 => Self::WhisperForeign,
            0x09 => Self::WhisperInform,
            0x0A => Self::Emote,
            0x0B => Self::TextEmote,
            0x0C => Self::MonsterSay,
            0x0E => Self::MonsterYell,
            0x10 => Self::MonsterEmote,
            0x11 => Self::Channel,
            0x12 => Self::ChannelJoin,
            0x13 => Self::ChannelLeave,
            0x15 => Self::ChannelNotice,
            0x17 => Self::Afk,
            0x18 => Self::Dnd,
            0x19 => Self::Ignored,
            0x1C => Self::Money,
            0x27 => Self::RaidLeader,
            0x28 => Self::RaidWarning,
            0x30 => Self::Achievement,
            0x31 => Self::GuildAchievement,
            0x33 => Self::PartyLeader,
            _ => return None,
        };
        Some(kind)
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::System => 0x00,
            Self::Say => 0x01,
            Self::Party => 0x02,
            Self::Raid => 0x03,
            Self::Guild => 0x04,
            Self::Officer => 0x05,
            Self::Yell => 0x06,
            Self::Whisper => 0x07,
            Self::WhisperForeign => 0x08,
            Self::WhisperInform => 0x09,
            Self::Emote => 0x0A,
            Self::TextEmote => 0x0B,
            Self::MonsterSay => 0x0C,
            Self::MonsterYell => 0x0E,
            Self::MonsterEmote => 0x10,
            Self::Channel => 0x11,
            Self::ChannelJoin => 0x12,
            Self::ChannelLeave => 0x13,
            Self::ChannelNotice => 0x15,
            Self::Afk => 0x17,
            Self::Dnd => 0x18,
            Self::Ignored => 0x19,
            Self::Money => 0x1C,
            Self::RaidLeader => 0x27,
            Self::RaidWarning => 0x28,
            Self::Achievement => 0x30,
            Self::GuildAchievement => 0x31,
            Self::PartyLeader => 0x33,
        }
    }

    /// Display label preceding a presented message.
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Say => "Say",
            Self::Party => "Party",
            Self::Raid => "Raid",
            Self::Guild => "Guild",
            Self::Officer => "Officer",
            Self::Yell => "Yell",
            Self::Whisper => "Whisper",
            Self::WhisperForeign => "WhisperForeign",
            Self::WhisperInform => "WhisperInform",
            Self::Emote => "Emote",
            Self::TextEmote => "TextEmote",
            Self::MonsterSay => "MonsterSay",
            Self::MonsterYell => "MonsterYell",
            Self::MonsterEmote => "MonsterEmote",
            Self::Channel => "Channel",
            Self::ChannelJoin => "ChannelJoin",
            Self::ChannelLeave => "ChannelLeave",
            Self::ChannelNotice => "ChannelNotice",
            Self::Afk => "Afk",
            Self::Dnd => "Dnd",
            Self::Ignored => "Ignored",
            Self::Money => "Money",
            Self::RaidLeader => "RaidLeader",
            Self::RaidWarning => "RaidWarning",
            Self::Achievement => "Achievement",
            Self::GuildAchievement => "GuildAchievement",
            Self::PartyLeader => "PartyLeader",
        }
    }

    /// Sender field carries a character name instead of a GUID reference.
    pub fn has_inline_sender(self) -> bool {
        matches!(
            self,
            Self::MonsterSay | Self::MonsterYell | Self::MonsterEmote
        )
    }
}

/// Chat language identifiers (3.3.5a wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language(pub u32);

impl Language {
    pub const UNIVERSAL: Language = Language(0);
    pub const ORCISH: Language = Language(1);
    pub const COMMON: Language = Language(7);
    pub const ADDON: Language = Language(0xFFFF_FFFF);

    /// The faction language spoken by a race.
    pub fn for_race(race: u8) -> Language {
        match race {
            2 | 5 | 6 | 8 | 10 => Language::ORCISH,
            _ => Language::COMMON,
        }
    }

    pub fn is_addon(self) -> bool {
        self == Language::ADDON
    }
}

/// Per-message sender status tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChatTag(pub u8);

impl ChatTag {
    pub const AFK: ChatTag = ChatTag(0x1);
    pub const DND: ChatTag = ChatTag(0x2);
    pub const GM: ChatTag = ChatTag(0x4);

    pub const fn contains(self, other: ChatTag) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A decoded chat message, possibly waiting on sender name resolution
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub kind: ChatMessageType,
    pub language: Language,
    pub sender_guid: u64,
    pub sender_name: String,
    pub channel: Option<String>,
    pub text: String,
    pub tag: ChatTag,
}

// ----------------------------------------------------------------------------
// Characters
// ----------------------------------------------------------------------------

/// One entry from the account's character list
#[derive(Debug, Clone)]
pub struct Character {
    pub guid: u64,
    pub name: String,
    pub race: u8,
    pub class: u8,
    pub gender: u8,
    pub level: u8,
    pub zone_id: u32,
    pub map_id: u32,
    pub guild_id: u32,
}

impl Character {
    /// The faction language this character speaks.
    pub fn language(&self) -> Language {
        Language::for_race(self.race)
    }
}

pub fn class_name(class: u8) -> &'static str {
    match class {
        1 => "Warrior",
        2 => "Paladin",
        3 => "Hunter",
        4 => "Rogue",
        5 => "Priest",
        6 => "DeathKnight",
        7 => "Shaman",
        8 => "Mage",
        9 => "Warlock",
        11 => "Druid",
        _ => "Unknown",
    }
}

pub fn race_name(race: u8) -> &'static str {
    match race {
        1 => "Human",
        2 => "Orc",
        3 => "Dwarf",
        4 => "NightElf",
        5 => "Undead",
        6 => "Tauren",
        7 => "Gnome",
        8 => "Troll",
        10 => "BloodElf",
        11 => "Draenei",
        _ => "Unknown",
    }
}

// ----------------------------------------------------------------------------
// Guild
// ----------------------------------------------------------------------------

/// Roster entry status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuildMemberFlags(pub u8);

impl GuildMemberFlags {
    pub const ONLINE: GuildMemberFlags = GuildMemberFlags(0x1);
    pub const AFK: GuildMemberFlags = GuildMemberFlags(0x2);
    pub const DND: GuildMemberFlags = GuildMemberFlags(0x4);
    pub const MOBILE: GuildMemberFlags = GuildMemberFlags(0x8);

    pub const fn contains(self, other: GuildMemberFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

pub const GUILD_BANK_MAX_TABS: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub struct GuildBankTab {
    pub rights: u8,
    pub slots: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GuildRank {
    pub rights: u32,
    pub bank_money_per_day: u32,
    pub tabs: [GuildBankTab; GUILD_BANK_MAX_TABS],
}

#[derive(Debug, Clone)]
pub struct GuildMember {
    pub guid: u64,
    pub flags: GuildMemberFlags,
    pub name: String,
    pub rank_id: u32,
    pub level: u8,
    pub class: u8,
    pub zone_id: u32,
    pub offline_days: f32,
    pub public_note: String,
    pub officer_note: String,
}

impl GuildMember {
    pub fn is_online(&self) -> bool {
        self.flags.contains(GuildMemberFlags::ONLINE)
    }
}

/// Everything known about the player's guild
#[derive(Debug, Clone, Default)]
pub struct GuildState {
    pub motd: String,
    pub info: String,
    pub ranks: Vec<GuildRank>,
    pub members: Vec<GuildMember>,
}

impl GuildState {
    pub fn online_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_online()).count()
    }
}

// ----------------------------------------------------------------------------
// World State
// ----------------------------------------------------------------------------

/// Mutable session state shared by every handler
#[derive(Debug, Default)]
pub struct WorldState {
    /// Characters listed for this account
    pub characters: Vec<Character>,

    /// The character currently in the world
    pub player: Option<Character>,

    /// Name lookup per GUID, filled via name queries
    player_names: HashMap<u64, String>,

    /// GUIDs with a name query in flight
    pending_names: HashSet<u64>,

    /// Messages waiting for their sender's name
    queued_chat: HashMap<u64, VecDeque<ChatMessage>>,

    /// Guild name lookup per guild id, filled via guild queries
    guild_names: HashMap<u32, String>,

    /// The player's guild
    pub guild: GuildState,

    /// Characters who last whispered us, most recent last
    last_whisperers: VecDeque<String>,
}

const WHISPERER_HISTORY: usize = 8;

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// GUID of the character in the world, zero before login completes.
    pub fn player_guid(&self) -> u64 {
        self.player.as_ref().map(|c| c.guid).unwrap_or(0)
    }

    pub fn find_character(&self, name: &str) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    // ------------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------------

    pub fn player_name(&self, guid: u64) -> Option<&str> {
        self.player_names.get(&guid).map(String::as_str)
    }

    /// Record a resolved name and release any messages queued behind it.
    pub fn resolve_player_name(&mut self, guid: u64, name: &str) -> Vec<ChatMessage> {
        self.player_names.insert(guid, name.to_owned());
        self.pending_names.remove(&guid);
        let mut released: Vec<ChatMessage> = match self.queued_chat.remove(&guid) {
            Some(queue) => queue.into(),
            None => Vec::new(),
        };
        for message in &mut released {
            message.sender_name = name.to_owned();
        }
        released
    }

    /// Park a message until its sender's name arrives. Returns true when a
    /// name query should be sent (first message from this GUID).
    pub fn queue_chat_message(&mut self, message: ChatMessage) -> bool {
        let guid = message.sender_guid;
        self.queued_chat.entry(guid).or_default().push_back(message);
        self.pending_names.insert(guid)
    }

    // ------------------------------------------------------------------------
    // Guild names
    // ------------------------------------------------------------------------

    pub fn guild_name(&self, guild_id: u32) -> Option<&str> {
        self.guild_names.get(&guild_id).map(String::as_str)
    }

    /// Record a guild name. Returns false when the id was already known.
    pub fn resolve_guild_name(&mut self, guild_id: u32, name: &str) -> bool {
        self.guild_names.insert(guild_id, name.to_owned()).is_none()
    }

    // ------------------------------------------------------------------------
    // Whisper history
    // ------------------------------------------------------------------------

    pub fn note_whisperer(&mut self, name: &str) {
        self.last_whisperers.retain(|w| w != name);
        self.last_whisperers.push_back(name.to_owned());
        while self.last_whisperers.len() > WHISPERER_HISTORY {
            self.last_whisperers.pop_front();
        }
    }

    /// The most recent character who whispered us.
    pub fn last_whisperer(&self) -> Option<&str> {
        self.last_whisperers.back().map(String::as_str)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn message_from(guid: u64, text: &str) -> ChatMessage {
        ChatMessage {
            kind: ChatMessageType::Say,
            language: Language::COMMON,
            sender_guid: guid,
            sender_name: String::new(),
            channel: None,
            text: text.to_owned(),
            tag: ChatTag::default(),
        }
    }

    #[test]
    fn chat_types_round_trip_between_wire_forms() {
        for value in 0u8..=0x33 {
            if let Some(kind) = ChatMessageType::from_wire(value) {
                assert_eq!(kind.to_wire(), u32::from(value));
            }
        }
        assert!(ChatMessageType::from_wire(0x7F).is_none());
    }

    #[test]
    fn horde_races_speak_orcish() {
        assert_eq!(Language::for_race(2), Language::ORCISH);
        assert_eq!(Language::for_race(6), Language::ORCISH);
        assert_eq!(Language::for_race(1), Language::COMMON);
        assert_eq!(Language::for_race(11), Language::COMMON);
    }

    #[test]
    fn first_message_from_a_guid_requests_a_name_query() {
        let mut world = WorldState::new();
        assert!(world.queue_chat_message(message_from(42, "first")));
        assert!(!world.queue_chat_message(message_from(42, "second")));
        assert!(world.queue_chat_message(message_from(43, "other")));
    }

    #[test]
    fn resolving_a_name_releases_queued_messages_in_order() {
        let mut world = WorldState::new();
        world.queue_chat_message(message_from(42, "first"));
        world.queue_chat_message(message_from(42, "second"));

        let released = world.resolve_player_name(42, "Throg");
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|m| m.sender_name == "Throg"));
        assert_eq!(released[0].text, "first");
        assert_eq!(released[1].text, "second");

        assert_eq!(world.player_name(42), Some("Throg"));
        assert!(world.resolve_player_name(42, "Throg").is_empty());
    }

    #[test]
    fn whisperer_history_keeps_the_most_recent_sender_last() {
        let mut world = WorldState::new();
        world.note_whisperer("Alda");
        world.note_whisperer("Brak");
        world.note_whisperer("Alda");
        assert_eq!(world.last_whisperer(), Some("Alda"));

        for i in 0..WHISPERER_HISTORY {
            world.note_whisperer(&format!("Extra{i}"));
        }
        assert_eq!(
            world.last_whisperer(),
            Some(format!("Extra{}", WHISPERER_HISTORY - 1).as_str())
        );
    }

    #[test]
    fn guild_online_count_follows_member_flags() {
        let mut guild = GuildState::default();
        for (i, flags) in [GuildMemberFlags::ONLINE, GuildMemberFlags::default()]
            .into_iter()
            .enumerate()
        {
            guild.members.push(GuildMember {
                guid: i as u64,
                flags,
                name: format!("Member{i}"),
                rank_id: 0,
                level: 80,
                class: 1,
                zone_id: 0,
                offline_days: 0.0,
                public_note: String::new(),
                officer_note: String::new(),
            });
        }
        assert_eq!(guild.online_count(), 1);
    }
}
