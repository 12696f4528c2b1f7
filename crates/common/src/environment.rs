//! Binance USDⓈ-M futures environment configuration.
//!
//! Production and testnet carry different REST and WebSocket hosts.

use std::fmt;
use std::str::FromStr;

/// Binance futures environment (production or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    /// Production environment (real money).
    #[default]
    Production,
    /// Testnet environment (fake money for testing).
    Testnet,
}

impl BinanceEnvironment {
    /// Futures REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://fapi.binance.com",
            Self::Testnet => "https://testnet.binancefuture.com",
        }
    }

    /// Futures WebSocket base URL for market data streams.
    pub fn ws_base_url(&self) -> &'static str {
        match self {
            Self::Production => "wss://fstream.binance.com",
            Self::Testnet => "wss://stream.binancefuture.com",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet)
    }

    /// Load from the `BINANCE_ENVIRONMENT` env var; `Production` when unset
    /// or unparseable.
    pub fn from_env() -> Self {
        std::env::var("BINANCE_ENVIRONMENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for BinanceEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" | "mainnet" | "main" => Ok(Self::Production),
            "testnet" | "test" | "sandbox" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Error parsing an environment string.
#[derive(Debug, Clone)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected 'production' or 'testnet'",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_urls() {
        let env = BinanceEnvironment::Production;
        assert_eq!(env.rest_base_url(), "https://fapi.binance.com");
        assert_eq!(env.ws_base_url(), "wss://fstream.binance.com");
        assert!(env.is_production());
    }

    #[test]
    fn test_testnet_urls() {
        let env = BinanceEnvironment::Testnet;
        assert_eq!(env.rest_base_url(), "https://testnet.binancefuture.com");
        assert_eq!(env.ws_base_url(), "wss://stream.binancefuture.com");
        assert!(env.is_testnet());
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "prod".parse::<BinanceEnvironment>().unwrap(),
            BinanceEnvironment::Production
        );
        assert_eq!(
            "TESTNET".parse::<BinanceEnvironment>().unwrap(),
            BinanceEnvironment::Testnet
        );
        assert!("invalid".parse::<BinanceEnvironment>().is_err());
    }

    #[test]
    fn test_default_is_production() {
        assert_eq!(
            BinanceEnvironment::default(),
            BinanceEnvironment::Production
        );
    }
}
