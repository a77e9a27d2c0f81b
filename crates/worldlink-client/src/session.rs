//! The session loop
//!
//! One session drives one connection from the first challenge to logout.
//! Every 100ms tick drains the handoff queue through the dispatcher, lets
//! handlers report events, and runs the scheduler; console lines arrive
//! interleaved through the same select. The server talks first, so there is
//! nothing to send until its challenge comes in.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;
use worldlink_core::{ActionScheduler, Connection, Dispatcher, SessionKey};

use crate::commands::{Command, CommandParser, ParseOutcome, HELP_TEXT};
use crate::config::ClientConfig;
use crate::error::{CliError, Result};
use crate::game::{self, GameContext, GameEvent};
use crate::handlers::{self, chat, guild, misc};
use crate::world::ChatMessageType;

const TICK: Duration = Duration::from_millis(100);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
const ROSTER_INTERVAL: Duration = Duration::from_secs(300);
const LOGOUT_GRACE: Duration = Duration::from_secs(20);

pub struct Session {
    connection: Connection,
    dispatcher: Dispatcher<GameContext>,
    scheduler: ActionScheduler<GameContext>,
    context: GameContext,
    parser: CommandParser,
    logging_out: bool,
}

impl Session {
    pub fn new(connection: Connection, config: ClientConfig, session_key: SessionKey) -> Self {
        let mut dispatcher = Dispatcher::new();
        handlers::register_all(&mut dispatcher);
        let context = GameContext::new(config, session_key, connection.sender());
        Self {
            connection,
            dispatcher,
            scheduler: ActionScheduler::new(),
            context,
            parser: CommandParser::new(),
            logging_out: false,
        }
    }

    /// Run until logout or connection loss, reading commands from stdin.
    pub async fn run(self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with_input(stdin).await
    }

    /// Like [`Session::run`] with commands read from an arbitrary source.
    pub async fn run_with_input<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let queue = self.connection.queue();
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = input.lines();
        let mut input_open = true;

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for mut packet in queue.drain_all() {
                        self.dispatcher.dispatch(&mut self.context, &mut packet);
                    }
                    if let Some(outcome) = self.process_events() {
                        break outcome;
                    }
                    self.scheduler.tick(Instant::now(), &mut self.context);
                    if self.connection.is_closed() {
                        break if self.logging_out {
                            Ok(())
                        } else {
                            Err(CliError::Session("the server connection was lost".into()))
                        };
                    }
                }
                line = lines.next_line(), if input_open => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line),
                        // Closed input means the operator is done with us.
                        Ok(None) | Err(_) => {
                            input_open = false;
                            self.begin_logout();
                        }
                    }
                }
            }
        };

        self.print_status();
        self.connection.dispose().await;
        outcome
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    fn process_events(&mut self) -> Option<Result<()>> {
        for event in self.context.take_events() {
            match event {
                GameEvent::EnteredWorld => self.on_entered_world(),
                GameEvent::LoginFailed(reason) => {
                    return Some(Err(CliError::Session(reason)));
                }
                GameEvent::LoggedOut => {
                    self.scheduler
                        .cancel_by_flag(game::LOGOUT, false, &mut self.context);
                    return Some(Ok(()));
                }
            }
        }
        None
    }

    fn on_entered_world(&mut self) {
        println!("Entered the world. Type /help for commands.");

        let now = Instant::now();
        self.scheduler.schedule(
            now + PING_INTERVAL,
            Some(PING_INTERVAL),
            game::KEEP_ALIVE,
            misc::send_ping,
        );
        self.scheduler.schedule(
            now + KEEP_ALIVE_INTERVAL,
            Some(KEEP_ALIVE_INTERVAL),
            game::KEEP_ALIVE,
            |context: &mut GameContext| misc::send_keep_alive(context),
        );

        let guild_id = self
            .context
            .world
            .player
            .as_ref()
            .map(|player| player.guild_id)
            .unwrap_or(0);
        if guild_id != 0 {
            if let Err(err) = guild::request_guild_query(&self.context, guild_id)
                .and_then(|_| guild::request_roster(&self.context))
            {
                warn!("Guild lookup failed: {}", err);
            }
            self.scheduler.schedule(
                now + ROSTER_INTERVAL,
                Some(ROSTER_INTERVAL),
                game::GUILD_REFRESH,
                |context: &mut GameContext| guild::request_roster(context),
            );
        }

        for channel in self.context.config.chat.channels.clone() {
            if let Err(err) = chat::join_channel(&self.context, &channel) {
                warn!("Could not join [{}]: {}", channel, err);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn handle_line(&mut self, line: &str) {
        match self.parser.parse(line) {
            ParseOutcome::Empty => {}
            ParseOutcome::Invalid(reason) => println!("{reason}"),
            ParseOutcome::Command(command) => self.execute(command),
        }
    }

    fn execute(&mut self, command: Command) {
        let in_world = self.context.world.player.is_some();
        let result = match command {
            Command::Help => {
                println!("{HELP_TEXT}");
                Ok(())
            }
            Command::Status => {
                self.print_status();
                Ok(())
            }
            Command::Quit => {
                self.begin_logout();
                Ok(())
            }
            _ if !in_world => {
                println!("Not in the world yet.");
                Ok(())
            }
            Command::Chat { kind, text } => chat::send_chat(&self.context, kind, None, &text),
            Command::Whisper { target, text } => {
                chat::send_chat(&self.context, ChatMessageType::Whisper, Some(&target), &text)
            }
            Command::Reply { text } => match self.context.world.last_whisperer() {
                Some(target) => {
                    let target = target.to_owned();
                    chat::send_chat(&self.context, ChatMessageType::Whisper, Some(&target), &text)
                }
                None => {
                    println!("Nobody has whispered you yet.");
                    Ok(())
                }
            },
            Command::Join { channel } => chat::join_channel(&self.context, &channel),
            Command::Leave { channel } => chat::leave_channel(&self.context, &channel),
            Command::Roster => {
                let in_guild = self
                    .context
                    .world
                    .player
                    .as_ref()
                    .is_some_and(|player| player.guild_id != 0);
                if in_guild {
                    guild::request_roster(&self.context)
                } else {
                    println!("Not in a guild.");
                    Ok(())
                }
            }
        };
        if let Err(err) = result {
            warn!("Command failed: {}", err);
        }
    }

    // ------------------------------------------------------------------------
    // Logout
    // ------------------------------------------------------------------------

    fn begin_logout(&mut self) {
        if self.logging_out {
            return;
        }
        self.logging_out = true;

        self.scheduler
            .disable_by_flag(game::KEEP_ALIVE, &mut self.context);
        self.scheduler
            .disable_by_flag(game::GUILD_REFRESH, &mut self.context);

        if self.context.world.player.is_none() {
            self.context.push_event(GameEvent::LoggedOut);
            return;
        }

        match misc::request_logout(&self.context) {
            Ok(()) => {
                // If the confirmation never comes, leave anyway.
                self.scheduler.schedule(
                    Instant::now() + LOGOUT_GRACE,
                    None,
                    game::LOGOUT,
                    |context: &mut GameContext| {
                        warn!("No logout confirmation, exiting");
                        context.push_event(GameEvent::LoggedOut);
                        Ok(())
                    },
                );
            }
            Err(_) => self.context.push_event(GameEvent::LoggedOut),
        }
    }

    fn print_status(&self) {
        let counters = self.connection.counters();
        println!(
            "Traffic: {} bytes sent, {} bytes received, {} total; latency {} ms",
            counters.sent(),
            counters.received(),
            counters.transferred(),
            self.context.latency_ms
        );
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
