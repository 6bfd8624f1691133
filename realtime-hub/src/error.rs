//! Error types for the broadcast hub

use thiserror::Error;

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hub errors
#[derive(Debug, Error)]
pub enum Error {
    /// Event payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown connection handle
    #[error("Unknown connection: {0}")]
    UnknownConnection(crate::hub::ConnectionId),

    /// Room name did not match `ride_<id>` / `driver_<id>`
    #[error("Invalid room name: {0}")]
    InvalidRoom(String),
}
