use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, Weak};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{DuelError, Result},
    session::GameSession,
    transport::{messages::ServerMessage, Outbound},
};

/// One connected player: identity plus the outbound half of its connection
#[derive(Debug)]
pub struct Participant {
    id: Uuid,
    name: String,
    peer: SocketAddr,
    tx: mpsc::Sender<Outbound>,
    opponent: OnceLock<Weak<Participant>>,
    session: OnceLock<Weak<GameSession>>,
}

impl Participant {
    pub fn new(name: impl Into<String>, peer: SocketAddr, tx: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            peer,
            tx,
            opponent: OnceLock::new(),
            session: OnceLock::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// False once the connection's writer has gone away
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn opponent(&self) -> Option<Arc<Participant>> {
        self.opponent.get().and_then(Weak::upgrade)
    }

    /// The session this participant was seated in, while it is alive
    pub fn session(&self) -> Option<Arc<GameSession>> {
        self.session.get().and_then(Weak::upgrade)
    }

    /// Link two participants to each other. Each link is set once.
    pub(crate) fn pair(first: &Arc<Participant>, second: &Arc<Participant>) {
        let _ = first.opponent.set(Arc::downgrade(second));
        let _ = second.opponent.set(Arc::downgrade(first));
    }

    pub(crate) fn attach(&self, session: &Arc<GameSession>) {
        let _ = self.session.set(Arc::downgrade(session));
    }

    pub async fn send(&self, message: ServerMessage) -> Result<()> {
        tracing::debug!("-> {}: {}", self.name, message);
        self.tx
            .send(Outbound::Line(message))
            .await
            .map_err(|_| DuelError::Transport {
                participant: self.name.clone(),
                reason: "connection closed".to_string(),
            })
    }

    /// Ask the connection to flush what is queued and hang up
    pub async fn close(&self) {
        let _ = self.tx.send(Outbound::Close).await;
    }

    /// Like `close`, for callers that cannot wait
    pub(crate) fn close_now(&self) {
        if self.tx.try_send(Outbound::Close).is_err() {
            tracing::debug!("Could not queue close for {}", self.name);
        }
    }
}

/// Running tally for one seat in a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreCard {
    pub score: i32,
    pub accepted: BTreeSet<String>,
    pub rejected: BTreeSet<String>,
    pub shared: BTreeSet<String>,
}

impl ScoreCard {
    /// Whether a submission of `word` by this seat has already been settled
    pub fn has_played(&self, word: &str) -> bool {
        self.accepted.contains(word) || self.rejected.contains(word) || self.shared.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_pair_links_both_ways() {
        let (tx, _rx) = mpsc::channel(4);
        let alice = Participant::new("alice", peer(1000), tx.clone());
        let bob = Participant::new("bob", peer(1001), tx);

        Participant::pair(&alice, &bob);

        assert_eq!(alice.opponent().unwrap().id(), bob.id());
        assert_eq!(bob.opponent().unwrap().id(), alice.id());
    }

    #[test]
    fn test_opponent_link_does_not_own() {
        let (tx, _rx) = mpsc::channel(4);
        let alice = Participant::new("alice", peer(1000), tx.clone());
        let bob = Participant::new("bob", peer(1001), tx);
        Participant::pair(&alice, &bob);

        drop(bob);
        assert!(alice.opponent().is_none());
    }

    #[tokio::test]
    async fn test_send_fails_after_connection_drops() {
        let (tx, rx) = mpsc::channel(4);
        let alice = Participant::new("alice", peer(1000), tx);
        assert!(alice.is_connected());

        drop(rx);
        assert!(!alice.is_connected());
        let err = alice.send(ServerMessage::Terminated).await.unwrap_err();
        assert!(matches!(err, DuelError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_send_and_close_are_queued_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let alice = Participant::new("alice", peer(1000), tx);

        tokio_test::assert_ok!(alice.send(ServerMessage::Countdown(3)).await);
        alice.close().await;

        assert_eq!(
            rx.recv().await,
            Some(Outbound::Line(ServerMessage::Countdown(3)))
        );
        assert_eq!(rx.recv().await, Some(Outbound::Close));
    }

    #[test]
    fn test_has_played() {
        let mut card = ScoreCard::default();
        assert!(!card.has_played("CAT"));
        card.accepted.insert("CAT".to_string());
        card.rejected.insert("XQZ".to_string());
        card.shared.insert("DOG".to_string());
        assert!(card.has_played("CAT"));
        assert!(card.has_played("XQZ"));
        assert!(card.has_played("DOG"));
        assert!(!card.has_played("EMU"));
    }
}
