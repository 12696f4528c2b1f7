//! Futures REST API error types.

use auth::AuthError;
use rest_client::RestError;
use thiserror::Error;

/// Errors from the futures REST API.
#[derive(Debug, Error)]
pub enum BinanceRestError {
    /// REST transport error (network, timeout, rate limit).
    #[error("REST client error: {0}")]
    Rest(#[from] RestError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The account lacks margin for the order (code -2019).
    #[error("insufficient margin: {0}")]
    InsufficientMargin(String),

    /// The account lacks balance for the order (code -2010).
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Any other exchange error with its wire code.
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// The error response itself could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl BinanceRestError {
    /// Parse a `{"code": -2019, "msg": "..."}` error body.
    pub fn from_api_response(body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiErrorBody {
            code: i32,
            msg: String,
        }

        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => Self::classify_api_error(err.code, err.msg),
            Err(_) => Self::Parse(format!("unparseable error response: {body}")),
        }
    }

    fn classify_api_error(code: i32, message: String) -> Self {
        match code {
            -2019 => Self::InsufficientMargin(message),
            -2010 => Self::InsufficientBalance(message),
            _ => Self::ApiError { code, message },
        }
    }

    /// Whether this failure means "not enough funds", which the orchestrator
    /// treats as a recoverable skip rather than a fault.
    pub fn is_balance_related(&self) -> bool {
        match self {
            Self::InsufficientMargin(_) | Self::InsufficientBalance(_) => true,
            Self::ApiError { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("balance") || lower.contains("insufficient")
            }
            _ => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rest(rest_err) => rest_err.is_retryable(),
            // Exchange-internal errors and rate-limit codes.
            Self::ApiError { code, .. } => matches!(code, -1000 | -1001 | -1003 | -1015 | -1016),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_margin_error() {
        let err = BinanceRestError::from_api_response(r#"{"code":-2019,"msg":"Margin is insufficient."}"#);
        assert!(matches!(err, BinanceRestError::InsufficientMargin(_)));
        assert!(err.is_balance_related());
    }

    #[test]
    fn test_classify_balance_error() {
        let err = BinanceRestError::from_api_response(
            r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#,
        );
        assert!(matches!(err, BinanceRestError::InsufficientBalance(_)));
        assert!(err.is_balance_related());
    }

    #[test]
    fn test_balance_recognized_from_message_text() {
        let err = BinanceRestError::from_api_response(r#"{"code":-4131,"msg":"Available balance too low"}"#);
        assert!(matches!(err, BinanceRestError::ApiError { .. }));
        assert!(err.is_balance_related());
    }

    #[test]
    fn test_other_codes_not_balance_related() {
        let err = BinanceRestError::from_api_response(
            r#"{"code":-1021,"msg":"Timestamp for this request is outside of the recvWindow."}"#,
        );
        assert!(!err.is_balance_related());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unparseable_body() {
        let err = BinanceRestError::from_api_response("<html>502</html>");
        assert!(matches!(err, BinanceRestError::Parse(_)));
    }

    #[test]
    fn test_server_errors_retryable() {
        let err = BinanceRestError::from_api_response(r#"{"code":-1001,"msg":"Internal error"}"#);
        assert!(err.is_retryable());
    }
}
