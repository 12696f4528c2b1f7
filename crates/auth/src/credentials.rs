//! Secure API credential handling.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

/// API key pair for signed requests.
///
/// The secret is held in a [`SecretString`]: it never appears in `Debug`
/// output and its memory is zeroed on drop.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
}

impl ApiCredentials {
    /// Load from `BINANCE_API_KEY` / `BINANCE_SECRET_KEY` (a `.env` file is
    /// honored when present).
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("BINANCE_API_KEY")
            .map_err(|_| AuthError::MissingEnvVar("BINANCE_API_KEY".into()))?;
        let secret_key = std::env::var("BINANCE_SECRET_KEY")
            .map_err(|_| AuthError::MissingEnvVar("BINANCE_SECRET_KEY".into()))?;

        Ok(Self::new(api_key, secret_key))
    }

    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
        }
    }

    /// The API key. Public, safe to log.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The secret key. Only for signing; never log the return value.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
