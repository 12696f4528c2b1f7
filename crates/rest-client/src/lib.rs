//! Thin REST layer over `reqwest`.
//!
//! Typed errors via `RestError`, JSON deserialization, header injection for
//! API-key authentication, and 429 rate-limit detection. Only the verbs the
//! futures API needs (GET and POST) are exposed.

mod client;
mod error;

pub use client::RestClient;
pub use error::RestError;
