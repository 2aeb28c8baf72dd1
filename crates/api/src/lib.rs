//! HTTP query surface of the notification hub.
//!
//! The binary in `main.rs` wires the event side (transport, subscription
//! workers, dispatcher, store) and serves the router built here.

pub mod background;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
