//! Futures trade-stream connector.
//!
//! Subscribes to the aggTrade WebSocket stream, turns each message into a
//! [`model::Tick`] event, and reconnects with jittered exponential backoff
//! when the connection drops.

mod client;
mod parser;

pub use client::run_connector;
pub use parser::{parse_message, ParsedMessage};
