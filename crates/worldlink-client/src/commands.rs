//! Console command parsing
//!
//! Slash commands drive outbound chat and session control. A bare line
//! repeats the last chat mode, so a conversation does not need the command
//! retyped for every message; for whispers that includes the target.

use crate::world::ChatMessageType;

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat { kind: ChatMessageType, text: String },
    Whisper { target: String, text: String },
    Reply { text: String },
    Join { channel: String },
    Leave { channel: String },
    Roster,
    Status,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Command(Command),
    Invalid(String),
    Empty,
}

// ----------------------------------------------------------------------------
// Parser
// ----------------------------------------------------------------------------

enum StickyChat {
    Plain(ChatMessageType),
    Whisper(String),
}

/// Line parser carrying the sticky chat mode between lines.
pub struct CommandParser {
    sticky: StickyChat,
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            sticky: StickyChat::Plain(ChatMessageType::Say),
        }
    }

    pub fn parse(&mut self, line: &str) -> ParseOutcome {
        let line = line.trim();
        if line.is_empty() {
            return ParseOutcome::Empty;
        }

        let Some(rest) = line.strip_prefix('/') else {
            // Bare text repeats the last chat mode.
            return ParseOutcome::Command(match &self.sticky {
                StickyChat::Plain(kind) => Command::Chat {
                    kind: *kind,
                    text: line.to_owned(),
                },
                StickyChat::Whisper(target) => Command::Whisper {
                    target: target.clone(),
                    text: line.to_owned(),
                },
            });
        };

        let (word, text) = match rest.split_once(char::is_whitespace) {
            Some((word, text)) => (word, text.trim()),
            None => (rest, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "s" | "say" => self.chat(ChatMessageType::Say, text),
            "y" | "yell" => self.chat(ChatMessageType::Yell, text),
            "g" | "guild" => self.chat(ChatMessageType::Guild, text),
            "o" | "officer" => self.chat(ChatMessageType::Officer, text),
            "w" | "whisper" => match text.split_once(char::is_whitespace) {
                Some((target, text)) if !text.trim().is_empty() => {
                    self.sticky = StickyChat::Whisper(target.to_owned());
                    ParseOutcome::Command(Command::Whisper {
                        target: target.to_owned(),
                        text: text.trim().to_owned(),
                    })
                }
                _ => ParseOutcome::Invalid("usage: /w <character> <message>".into()),
            },
            "r" | "reply" => {
                if text.is_empty() {
                    ParseOutcome::Invalid("usage: /r <message>".into())
                } else {
                    ParseOutcome::Command(Command::Reply {
                        text: text.to_owned(),
                    })
                }
            }
            "join" => Self::channel(text, |channel| Command::Join { channel }),
            "leave" => Self::channel(text, |channel| Command::Leave { channel }),
            "roster" => ParseOutcome::Command(Command::Roster),
            "status" => ParseOutcome::Command(Command::Status),
            "quit" | "exit" => ParseOutcome::Command(Command::Quit),
            "help" => ParseOutcome::Command(Command::Help),
            other => ParseOutcome::Invalid(format!("unknown command '/{other}', try /help")),
        }
    }

    fn chat(&mut self, kind: ChatMessageType, text: &str) -> ParseOutcome {
        self.sticky = StickyChat::Plain(kind);
        if text.is_empty() {
            ParseOutcome::Empty
        } else {
            ParseOutcome::Command(Command::Chat {
                kind,
                text: text.to_owned(),
            })
        }
    }

    fn channel(text: &str, build: impl FnOnce(String) -> Command) -> ParseOutcome {
        match text.split_whitespace().next() {
            Some(channel) => ParseOutcome::Command(build(channel.to_owned())),
            None => ParseOutcome::Invalid("a channel name is required".into()),
        }
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  /s /say <text>       say something nearby
  /y /yell <text>      yell across the zone
  /g /guild <text>     speak in guild chat
  /o /officer <text>   speak in officer chat
  /w <target> <text>   whisper a character (bare lines keep whispering them)
  /r <text>            reply to the last whisper
  /join <channel>      join a chat channel
  /leave <channel>     leave a chat channel
  /roster              refresh and show the guild roster
  /status              show connection traffic counters
  /quit                log out and exit
A line without a leading / repeats the last chat mode.";

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
