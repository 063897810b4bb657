use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Grid;

/// How a session ended
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The clock ran out
    Finished,
    /// A participant disconnected or a send failed
    Terminated,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerResult {
    pub name: String,
    pub score: i32,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Immutable record of one finished session, handed to a `ResultsSink`
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub board: Grid,
    pub outcome: Outcome,
    pub players: [PlayerResult; 2],
    /// Words found by both players, which score for neither
    pub shared: Vec<String>,
    /// Every dictionary word on the board; empty for terminated sessions
    pub possible_words: Vec<String>,
    pub possible_points: i32,
    pub finished_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Name of the higher scorer, or `None` on a tie
    pub fn winner(&self) -> Option<&str> {
        let [first, second] = &self.players;
        match first.score.cmp(&second.score) {
            std::cmp::Ordering::Greater => Some(&first.name),
            std::cmp::Ordering::Less => Some(&second.name),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Receives end-of-session summaries for persistence or reporting
#[async_trait]
pub trait ResultsSink: Send + Sync {
    async fn record(&self, summary: SessionSummary) -> anyhow::Result<()>;
}

/// Writes each summary to the log as JSON
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ResultsSink for LogSink {
    async fn record(&self, summary: SessionSummary) -> anyhow::Result<()> {
        let json = serde_json::to_string(&summary)?;
        tracing::info!(
            "Session {} {:?}, winner: {}",
            summary.session_id,
            summary.outcome,
            summary.winner().unwrap_or("tie")
        );
        tracing::debug!("Session summary: {}", json);
        Ok(())
    }
}

/// Forwards summaries to a channel so another task can subscribe
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionSummary>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionSummary>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResultsSink for ChannelSink {
    async fn record(&self, summary: SessionSummary) -> anyhow::Result<()> {
        self.tx
            .send(summary)
            .map_err(|_| anyhow::anyhow!("summary subscriber has gone away"))
    }
}
