//! Command dispatch table
//!
//! Handlers are plain functions registered against explicit command values.
//! A handler that fails is logged and skipped so one malformed frame never
//! takes the session down, and commands nobody registered are logged at a
//! level that depends on whether they are known chatter.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::packet::InPacket;
use crate::types::OpCode;

pub type Handler<C> = fn(&mut C, &mut InPacket) -> Result<()>;

pub struct Dispatcher<C> {
    handlers: HashMap<OpCode, Handler<C>>,
    quiet: HashSet<OpCode>,
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            quiet: HashSet::new(),
        }
    }

    /// Bind `handler` to `opcode`. Registering twice replaces the first
    /// binding.
    pub fn register(&mut self, opcode: OpCode, handler: Handler<C>) {
        self.handlers.insert(opcode, handler);
    }

    /// Mark a command as expected chatter, keeping unhandled arrivals out
    /// of the debug log.
    pub fn silence(&mut self, opcode: OpCode) {
        self.quiet.insert(opcode);
    }

    pub fn is_registered(&self, opcode: OpCode) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Route one frame to its handler, if any.
    pub fn dispatch(&self, context: &mut C, packet: &mut InPacket) {
        let opcode = packet.opcode();
        match self.handlers.get(&opcode) {
            Some(handler) => {
                if let Err(err) = handler(context, packet) {
                    warn!("{} handler failed: {}", opcode, err);
                }
            }
            None if self.quiet.contains(&opcode) => {
                trace!("Ignoring {} ({} bytes)", opcode, packet.len());
            }
            None => {
                debug!("Unhandled {} ({} bytes)", opcode, packet.len());
            }
        }
    }
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}
