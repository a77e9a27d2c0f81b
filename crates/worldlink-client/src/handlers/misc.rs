//! Liveness traffic, time synchronization, and the logout exchange

use tracing::{debug, info, warn};
use worldlink_core::{opcodes, InPacket, OutPacket, Result};

use crate::game::{GameContext, GameEvent};

// ----------------------------------------------------------------------------
// Ping and Keep-Alive
// ----------------------------------------------------------------------------

/// Send the next ping, echoing the last measured round-trip time.
pub fn send_ping(context: &mut GameContext) -> Result<()> {
    let mut packet = OutPacket::new(opcodes::CMSG_PING);
    packet.write_u32(context.ping_sequence);
    packet.write_u32(context.latency_ms);
    context.send(packet)?;

    context.ping_sequence = context.ping_sequence.wrapping_add(1);
    context.ping_sent_at = Some(std::time::Instant::now());
    Ok(())
}

pub fn handle_pong(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let sequence = packet.read_u32()?;
    if let Some(sent_at) = context.ping_sent_at.take() {
        context.latency_ms = sent_at.elapsed().as_millis() as u32;
    }
    debug!("Pong {} ({} ms)", sequence, context.latency_ms);
    Ok(())
}

pub fn send_keep_alive(context: &GameContext) -> Result<()> {
    context.send(OutPacket::new(opcodes::CMSG_KEEP_ALIVE))
}

// ----------------------------------------------------------------------------
// Time Synchronization
// ----------------------------------------------------------------------------

pub fn handle_time_sync(context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let counter = packet.read_u32()?;

    let mut response = OutPacket::new(opcodes::CMSG_TIME_SYNC_RESP);
    response.write_u32(counter.wrapping_add(1));
    response.write_u32(context.client_ticks());
    context.send(response)
}

// ----------------------------------------------------------------------------
// Logout
// ----------------------------------------------------------------------------

pub fn request_logout(context: &GameContext) -> Result<()> {
    info!("Requesting logout");
    context.send(OutPacket::new(opcodes::CMSG_LOGOUT_REQUEST))
}

pub fn handle_logout_response(_context: &mut GameContext, packet: &mut InPacket) -> Result<()> {
    let reason = packet.read_u32()?;
    let instant = packet.read_u8()?;
    if reason == 0 {
        debug!("Logout accepted (instant: {})", instant != 0);
    } else {
        warn!("Logout delayed by the server (reason {})", reason);
    }
    Ok(())
}

pub fn handle_logout_complete(context: &mut GameContext, _packet: &mut InPacket) -> Result<()> {
    println!("Logged out.");
    context.push_event(GameEvent::LoggedOut);
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
