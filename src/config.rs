use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

use crate::models::Grid;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Outbound lines queued per connection before senders wait
    pub outbound_buffer: usize,
}

/// How the board is announced when play starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoardAnnouncement {
    /// `BOARD <letters> <seconds>`
    #[default]
    Board,
    /// `START <letters> <seconds> <opponent>`
    Start,
}

impl FromStr for BoardAnnouncement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "board" => Ok(BoardAnnouncement::Board),
            "start" => Ok(BoardAnnouncement::Start),
            other => bail!("unknown protocol variant {:?} (expected board or start)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub dictionary_path: String,
    /// Length of a game in seconds
    pub duration_secs: u32,
    /// Countdown ticks before the board is shown
    pub countdown_ticks: u32,
    /// Countdown ticks after both players resume
    pub resume_countdown_ticks: u32,
    /// Fixed board for every session instead of a random one
    pub board_layout: Option<Grid>,
    /// Refuse to pair two connections from the same IP address
    pub pairing_guard: bool,
    pub announcement: BoardAnnouncement,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dictionary_path: "./dictionary.txt".to_string(),
            duration_secs: 180,
            countdown_ticks: 3,
            resume_countdown_ticks: 3,
            board_layout: None,
            pairing_guard: true,
            announcement: BoardAnnouncement::Board,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "4444".to_string())
                .parse()
                .context("PORT must be a number")?,
            outbound_buffer: lookup("OUTBOUND_BUFFER")
                .unwrap_or_else(|| "100".to_string())
                .parse()
                .context("OUTBOUND_BUFFER must be a number")?,
        };
        if server.outbound_buffer == 0 {
            bail!("OUTBOUND_BUFFER must be at least 1");
        }

        let defaults = GameConfig::default();
        let game = GameConfig {
            dictionary_path: lookup("DICTIONARY_PATH").unwrap_or(defaults.dictionary_path),
            duration_secs: lookup("GAME_DURATION")
                .map(|v| v.parse())
                .transpose()
                .context("GAME_DURATION must be a number of seconds")?
                .unwrap_or(defaults.duration_secs),
            countdown_ticks: lookup("COUNTDOWN_TICKS")
                .map(|v| v.parse())
                .transpose()
                .context("COUNTDOWN_TICKS must be a number")?
                .unwrap_or(defaults.countdown_ticks),
            resume_countdown_ticks: lookup("RESUME_COUNTDOWN_TICKS")
                .map(|v| v.parse())
                .transpose()
                .context("RESUME_COUNTDOWN_TICKS must be a number")?
                .unwrap_or(defaults.resume_countdown_ticks),
            board_layout: lookup("BOARD_LAYOUT")
                .filter(|layout| !layout.trim().is_empty())
                .map(|layout| Grid::from_layout(layout.trim()))
                .transpose()
                .context("BOARD_LAYOUT must be 16 letters")?,
            pairing_guard: lookup("PAIRING_GUARD")
                .map(|v| v.parse())
                .transpose()
                .context("PAIRING_GUARD must be true or false")?
                .unwrap_or(defaults.pairing_guard),
            announcement: lookup("PROTOCOL_VARIANT")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.announcement),
        };
        if game.duration_secs == 0 {
            bail!("GAME_DURATION must be at least 1 second");
        }

        Ok(Config { server, game })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
