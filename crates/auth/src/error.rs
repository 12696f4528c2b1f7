//! Authentication error types.

use thiserror::Error;

/// Errors during credential handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
}
