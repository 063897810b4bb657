pub mod handler;
pub mod messages;

pub use handler::{handle_connection, serve, ServerState};

use messages::ServerMessage;

/// What a session can ask of a connection's writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one protocol line
    Line(ServerMessage),
    /// Flush and hang up
    Close,
}
