//! Dispatch service
//!
//! HTTP + WebSocket surface for the ride marketplace. Owns the
//! store-backed ride lifecycle engine, the payment reconciliation
//! handler, the in-memory driver location index, and the thin adapters
//! for the payment, mapping, auth and mail collaborators.

#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod database;
pub mod email;
pub mod errors;
pub mod handlers;
pub mod location;
pub mod maps;
pub mod models;
pub mod payments;
pub mod receipt;
pub mod services;
pub mod sidefx;
pub mod stripe;

pub use config::Config;
pub use errors::{DispatchError, Result};
