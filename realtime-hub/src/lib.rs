//! Realtime broadcast hub
//!
//! Room-scoped fan-out of ride lifecycle and location events to live
//! socket connections:
//! - Closed, typed event catalog (no stringly-typed payloads)
//! - Per-room membership tied to connection lifetime, never persisted
//! - Best-effort, at-most-once delivery; per-room emission order holds
//!   per subscriber, nothing is replayed to late joiners
//!
//! Broadcasts are refetch prompts, not the source of truth; clients
//! reconcile against the store.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod event;
pub mod hub;
pub mod room;

pub use error::{Error, Result};
pub use event::{ClientCommand, RideEvent};
pub use hub::{BroadcastHub, ConnectionId};
pub use room::Room;
