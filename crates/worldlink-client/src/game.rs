//! Session context shared by packet handlers and scheduled actions
//!
//! Handlers get `&mut GameContext` and nothing else, so anything they need
//! to reach lives here: the outbound sender, configuration, world state, and
//! an event list the session loop drains after every dispatch batch.

use std::time::Instant;

use rand::Rng;
use worldlink_core::{ActionFlags, OutPacket, PacketSender, Result, SessionKey};

use crate::config::ClientConfig;
use crate::world::WorldState;

// ----------------------------------------------------------------------------
// Action Flags
// ----------------------------------------------------------------------------

/// Heartbeat traffic while in the world (ping, keep-alive)
pub const KEEP_ALIVE: ActionFlags = ActionFlags::new(0x1);

/// Periodic guild roster refresh
pub const GUILD_REFRESH: ActionFlags = ActionFlags::new(0x2);

/// The forced-exit fallback armed while a logout request is pending
pub const LOGOUT: ActionFlags = ActionFlags::new(0x4);

// ----------------------------------------------------------------------------
// Game Events
// ----------------------------------------------------------------------------

/// State changes handlers report back to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Login verify arrived; the player is standing in the world
    EnteredWorld,

    /// Authentication or character selection cannot proceed
    LoginFailed(String),

    /// The server confirmed logout; the session should end
    LoggedOut,
}

// ----------------------------------------------------------------------------
// Game Context
// ----------------------------------------------------------------------------

pub struct GameContext {
    pub config: ClientConfig,
    pub session_key: SessionKey,

    /// Random seed contributed to the session proof
    pub client_seed: u32,

    pub world: WorldState,

    /// Sequence number of the next ping
    pub ping_sequence: u32,

    /// When the outstanding ping left, if one is in flight
    pub ping_sent_at: Option<Instant>,

    /// Round-trip time measured by the last pong, in milliseconds
    pub latency_ms: u32,

    events: Vec<GameEvent>,
    sender: PacketSender,
    started: Instant,
}

impl GameContext {
    pub fn new(config: ClientConfig, session_key: SessionKey, sender: PacketSender) -> Self {
        Self {
            config,
            session_key,
            client_seed: rand::thread_rng().gen(),
            world: WorldState::new(),
            ping_sequence: 0,
            ping_sent_at: None,
            latency_ms: 0,
            events: Vec::new(),
            sender,
            started: Instant::now(),
        }
    }

    /// Queue a frame on the connection's outbound channel.
    pub fn send(&self, packet: OutPacket) -> Result<()> {
        self.sender.send(packet)
    }

    /// Switch the header cipher on for both directions.
    pub fn enable_encryption(&self) -> Result<()> {
        self.sender.enable_encryption(&self.session_key)
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain events accumulated since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Milliseconds since the session started, wrapped to the wire width.
    pub fn client_ticks(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
