//! Error types for the domain core

use crate::types::RideStatus;
use thiserror::Error;

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Transition not legal from the current status
    #[error("Invalid transition: {action} from {from}")]
    InvalidTransition {
        /// Status the ride was in
        from: RideStatus,
        /// Requested action, by name
        action: &'static str,
    },

    /// Coordinate outside the valid latitude/longitude range, or not finite
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Distance could not be expressed as a money amount
    #[error("Invalid distance: {0}")]
    InvalidDistance(f64),

    /// Unknown status string from the store
    #[error("Unknown ride status: {0}")]
    UnknownStatus(String),
}
