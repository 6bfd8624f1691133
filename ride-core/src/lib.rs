//! Ride dispatch domain core
//!
//! Ride lifecycle state machine, fare pricing and geodesy shared by the
//! matching path and the HTTP/real-time surfaces.
//!
//! # Invariants
//!
//! - `driver_id` is unset iff a ride is `pending`; once accepted it never changes
//! - Fare is computed once at creation and never recalculated
//! - A declined ride stays `pending`; `declined_by` only filters visibility

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod pricing;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use geo::{haversine_km, Coordinates};
pub use lifecycle::{next_status, note_decline, LifecycleAction};
pub use pricing::{quote, BASE_FARE, RATE_PER_KM};
pub use types::{DriverProfile, Ride, RideClass, RidePaymentStatus, RideStatus};
