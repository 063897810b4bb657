use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    error::DuelError,
    game::GridGenerator,
    session::{GameSession, Participant, SessionContext},
};

/// Matches arriving participants two at a time.
///
/// Holds at most one waiting participant. Checking the slot and pairing
/// happen under one lock, so every two offers produce exactly one session.
pub struct PairingRegistry {
    waiting: Mutex<Option<Arc<Participant>>>,
    context: Arc<SessionContext>,
}

impl PairingRegistry {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            waiting: Mutex::new(None),
            context,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Seat `participant`, or pair it with the one already waiting.
    ///
    /// Returns the new session when a pair is formed. The session is
    /// registered but not opened; the caller opens it.
    pub fn offer(&self, participant: Arc<Participant>) -> Option<Arc<GameSession>> {
        let mut waiting = self.waiting.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(waiter) = waiting.take() else {
            tracing::info!("{} is waiting for an opponent", participant.name());
            *waiting = Some(participant);
            return None;
        };

        if !waiter.is_connected() {
            tracing::info!(
                "Dropping disconnected waiter {}; {} takes the slot",
                waiter.name(),
                participant.name()
            );
            *waiting = Some(participant);
            return None;
        }

        if self.context.config.pairing_guard && waiter.peer().ip() == participant.peer().ip() {
            let conflict = DuelError::PairingConflict {
                peer: waiter.peer().ip(),
            };
            tracing::warn!("{}; replacing stale waiter {}", conflict, waiter.name());
            waiter.close_now();
            *waiting = Some(participant);
            return None;
        }

        Participant::pair(&waiter, &participant);
        let grid = self
            .context
            .config
            .board_layout
            .clone()
            .unwrap_or_else(GridGenerator::generate);
        let session = GameSession::new(Arc::clone(&self.context), [waiter, participant], grid);

        tracing::info!(
            "Paired {} with {} in session {}",
            session.participant(0).name(),
            session.participant(1).name(),
            session.id()
        );

        Some(session)
    }

    /// Remove `participant` from the waiting slot if it is there
    pub fn withdraw(&self, participant: &Participant) -> bool {
        let mut waiting = self.waiting.lock().unwrap_or_else(PoisonError::into_inner);
        if waiting.as_ref().is_some_and(|w| w.id() == participant.id()) {
            *waiting = None;
            tracing::info!("{} stopped waiting", participant.name());
            true
        } else {
            false
        }
    }

    pub fn waiting(&self) -> Option<Arc<Participant>> {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
