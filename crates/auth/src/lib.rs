//! Credential management and request signing for the exchange API.
//!
//! Secrets live in `SecretString` so they cannot leak through `Debug`
//! output and are zeroed on drop. Signed endpoints use HMAC-SHA256 over
//! the query string, as the futures API requires.

mod credentials;
mod error;
mod signer;

pub use credentials::ApiCredentials;
pub use error::AuthError;
pub use signer::RequestSigner;
