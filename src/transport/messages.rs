use std::fmt;
use std::str::FromStr;

use crate::error::DuelError;

/// Messages sent from client to server, one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `PLAY [name]`: join with a name, or acknowledge once seated
    Play { name: Option<String> },
    /// `NEW_PLAYER <name>`
    NewPlayer { name: String },
    /// `READY`
    Ready,
    /// `WORD <word>`
    Word { word: String },
    /// `CHAT <text>`, relayed to the opponent untouched
    Chat { text: String },
    /// `PAUSE`
    Pause,
    /// `RESUME`
    Resume,
    /// `CANCEL <true|false>`: `true` retracts a pending ready or resume
    Cancel { retract: bool },
}

impl ClientMessage {
    /// Parse one inbound line. Unknown verbs and bad arguments are a
    /// `ProtocolViolation` carrying the original line.
    pub fn parse(line: &str) -> Result<Self, DuelError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let violation = || DuelError::ProtocolViolation(line.to_string());

        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let message = match verb {
            "PLAY" => ClientMessage::Play {
                name: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "NEW_PLAYER" if !rest.is_empty() => ClientMessage::NewPlayer {
                name: rest.to_string(),
            },
            "READY" => ClientMessage::Ready,
            "WORD" if !rest.is_empty() && !rest.contains(char::is_whitespace) => {
                ClientMessage::Word {
                    word: rest.to_uppercase(),
                }
            }
            // Chat text is opaque, so keep the original spacing.
            "CHAT" => ClientMessage::Chat {
                text: line.get(5..).unwrap_or_default().to_string(),
            },
            "PAUSE" => ClientMessage::Pause,
            "RESUME" => ClientMessage::Resume,
            "CANCEL" => ClientMessage::Cancel {
                retract: parse_flag(rest).ok_or_else(violation)?,
            },
            _ => return Err(violation()),
        };

        Ok(message)
    }
}

impl FromStr for ClientMessage {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// End-of-game word lists from one recipient's point of view.
///
/// Rendered in this order: own legal, opponent legal, shared, own illegal,
/// opponent illegal. Each block is a count followed by that many words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopSummary {
    pub own_legal: Vec<String>,
    pub opponent_legal: Vec<String>,
    pub shared: Vec<String>,
    pub own_illegal: Vec<String>,
    pub opponent_illegal: Vec<String>,
}

impl StopSummary {
    fn blocks(&self) -> [&[String]; 5] {
        [
            &self.own_legal,
            &self.opponent_legal,
            &self.shared,
            &self.own_illegal,
            &self.opponent_illegal,
        ]
    }
}

impl fmt::Display for StopSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, block) in self.blocks().iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", block.len())?;
            for word in block.iter() {
                write!(f, " {}", word)?;
            }
        }
        Ok(())
    }
}

/// Messages sent from server to client, one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Ready {
        opponent: String,
    },
    Countdown(u32),
    Board {
        letters: String,
        seconds: u32,
    },
    Start {
        letters: String,
        seconds: u32,
        opponent: String,
    },
    Time(u32),
    Score {
        mine: i32,
        theirs: i32,
    },
    Pause,
    Resume,
    Chat {
        text: String,
    },
    Stop(StopSummary),
    Terminated,
    Ignoring {
        line: String,
    },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Ready { opponent } => write!(f, "READY {}", opponent),
            ServerMessage::Countdown(n) => write!(f, "COUNTDOWN {}", n),
            ServerMessage::Board { letters, seconds } => write!(f, "BOARD {} {}", letters, seconds),
            ServerMessage::Start {
                letters,
                seconds,
                opponent,
            } => write!(f, "START {} {} {}", letters, seconds, opponent),
            ServerMessage::Time(left) => write!(f, "TIME {}", left),
            ServerMessage::Score { mine, theirs } => write!(f, "SCORE {} {}", mine, theirs),
            ServerMessage::Pause => write!(f, "PAUSE"),
            ServerMessage::Resume => write!(f, "RESUME"),
            ServerMessage::Chat { text } => write!(f, "CHAT {}", text),
            ServerMessage::Stop(summary) => write!(f, "STOP {}", summary),
            ServerMessage::Terminated => write!(f, "TERMINATED"),
            ServerMessage::Ignoring { line } => write!(f, "IGNORING {}", line),
        }
    }
}
