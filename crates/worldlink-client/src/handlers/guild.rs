//! Guild queries, the roster, and guild events

use tracing::{debug, info};
use worldlink_core::{opcodes, InPacket, OutPacket, Result};

use crate::game::GameContext;
use crate::world::{
    class_name, GuildBankTab, GuildMember, GuildMemberFlags, GuildRank, GuildState,
    GUILD_BANK_MAX_TABS,
};

// ----------------------------------------------------------------------------
// Guild Name Lookup
// ----------------------------------------------------------------------------

pub fn request_guild_query(context: &GameContext, guild_id: u32) -> Result<()> {
    let mut query = OutPacket::new(opcodes::CMSG_GUILD_QUERY);
    query.write_u32(guild_id);
    context.send(query)
}

pub fn handle_guild_query_response(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let guild_id = packet.read_u32()?;
    let name = packet.read_cstring()?;
    let leading_rank = packet.read_cstring()?;

    if context.world.resolve_guild_name(guild_id, &name) {
        info!("Guild {} ({})", name, leading_rank);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Roster
// ----------------------------------------------------------------------------

pub fn request_roster(context: &GameContext) -> Result<()> {
    context.send(OutPacket::new(opcodes::CMSG_GUILD_ROSTER))
}

pub fn handle_guild_roster(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let member_count = packet.read_u32()?;
    let motd = packet.read_cstring()?;
    let info = packet.read_cstring()?;
    let rank_count = packet.read_u32()?;

    let mut guild = GuildState {
        motd,
        info,
        ranks: Vec::with_capacity(rank_count as usize),
        members: Vec::with_capacity(member_count as usize),
    };

    for _ in 0..rank_count {
        guild.ranks.push(read_rank(packet)?);
    }
    for _ in 0..member_count {
        guild.members.push(read_member(packet)?);
    }

    if !guild.motd.is_empty() {
        println!("Guild MOTD: {}", guild.motd);
    }
    println!(
        "Guild roster: {} members, {} online",
        guild.members.len(),
        guild.online_count()
    );
    for member in guild.members.iter().filter(|m| m.is_online()) {
        if member.public_note.is_empty() {
            println!("  {}, L{} {}", member.name, member.level, class_name(member.class));
        } else {
            println!(
                "  {}, L{} {} - {}",
                member.name,
                member.level,
                class_name(member.class),
                member.public_note
            );
        }
    }

    context.world.guild = guild;
    Ok(())
}

fn read_rank(packet: &mut InPacket) -> Result<GuildRank> {
    let rights = packet.read_u32()?;
    let bank_money_per_day = packet.read_u32()?;
    let mut tabs = [GuildBankTab::default(); GUILD_BANK_MAX_TABS];
    for tab in &mut tabs {
        tab.rights = packet.read_u8()?;
        tab.slots = packet.read_u32()?;
    }
    Ok(GuildRank {
        rights,
        bank_money_per_day,
        tabs,
    })
}

fn read_member(packet: &mut InPacket) -> Result<GuildMember> {
    let guid = packet.read_u64()?;
    let flags = GuildMemberFlags(packet.read_u8()?);
    let name = packet.read_cstring()?;
    let rank_id = packet.read_u32()?;
    let level = packet.read_u8()?;
    let class = packet.read_u8()?;
    packet.skip(1)?; // gender slot, always zero
    let zone_id = packet.read_u32()?;
    let offline_days = if flags.contains(GuildMemberFlags::ONLINE) {
        0.0
    } else {
        packet.read_f32()?
    };
    let public_note = packet.read_cstring()?;
    let officer_note = packet.read_cstring()?;

    Ok(GuildMember {
        guid,
        flags,
        name,
        rank_id,
        level,
        class,
        zone_id,
        offline_days,
        public_note,
        officer_note,
    })
}

// ----------------------------------------------------------------------------
// Guild Events
// ----------------------------------------------------------------------------

const GE_MOTD: u8 = 2;
const GE_JOINED: u8 = 3;
const GE_LEFT: u8 = 4;
const GE_SIGNED_ON: u8 = 12;
const GE_SIGNED_OFF: u8 = 13;

pub fn handle_guild_event(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let event = packet.read_u8()?;
    let count = packet.read_u8()?;
    let mut strings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        strings.push(packet.read_cstring()?);
    }

    match (event, strings.first()) {
        (GE_MOTD, Some(motd)) => {
            context.world.guild.motd = motd.clone();
            println!("Guild MOTD: {motd}");
        }
        (GE_JOINED, Some(name)) => println!("{name} has joined the guild."),
        (GE_LEFT, Some(name)) => println!("{name} has left the guild."),
        (GE_SIGNED_ON, Some(name)) => println!("{name} has come online."),
        (GE_SIGNED_OFF, Some(name)) => println!("{name} has gone offline."),
        _ => debug!("Guild event {} {:?}", event, strings),
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
