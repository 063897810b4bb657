use std::net::IpAddr;

use thiserror::Error;

/// Errors raised by the game core.
#[derive(Debug, Error)]
pub enum DuelError {
    /// A board layout string was not exactly 16 ASCII letters
    #[error("invalid board layout {layout:?}: {reason}")]
    InvalidLayout { layout: String, reason: String },

    /// Sending to or receiving from a participant failed
    #[error("transport failure for participant {participant}: {reason}")]
    Transport { participant: String, reason: String },

    /// An inbound line did not match any known verb or had bad arguments
    #[error("unrecognized input: {0}")]
    ProtocolViolation(String),

    /// Two waiting participants came from the same peer address
    #[error("participant from {peer} is already waiting for an opponent")]
    PairingConflict { peer: IpAddr },
}

pub type Result<T> = std::result::Result<T, DuelError>;
