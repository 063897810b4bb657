// Pairing, per-session state machine and end-of-game records

pub mod game;
pub mod pairing;
pub mod participant;
pub mod summary;

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::{config::GameConfig, game::WordValidator};

pub use game::{GameSession, Phase};
pub use pairing::PairingRegistry;
pub use participant::{Participant, ScoreCard};
pub use summary::{ChannelSink, LogSink, Outcome, ResultsSink, SessionSummary};

/// Everything a session needs from the server, shared by all sessions
pub struct SessionContext {
    pub validator: WordValidator,
    pub config: GameConfig,
    pub sink: Arc<dyn ResultsSink>,
    /// Sessions between pairing and completion, keyed by session id
    pub sessions: DashMap<Uuid, Arc<GameSession>>,
}

impl SessionContext {
    pub fn new(
        validator: WordValidator,
        config: GameConfig,
        sink: Arc<dyn ResultsSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            validator,
            config,
            sink,
            sessions: DashMap::new(),
        })
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
