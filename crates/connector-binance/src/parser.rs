//! aggTrade message parsing.

use model::Tick;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw aggTrade payload from the futures stream.
#[derive(Debug, Deserialize)]
pub struct AggTradeRaw {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub qty: Decimal,
    #[serde(rename = "T")]
    pub timestamp_ms: i64,
}

/// Wrapper used by combined streams (`/stream?streams=...`).
#[derive(Debug, Deserialize)]
pub struct CombinedStreamWrapper {
    #[allow(dead_code)]
    pub stream: String,
    pub data: AggTradeRaw,
}

pub enum ParsedMessage {
    Tick(Tick),
    Unknown,
}

impl From<AggTradeRaw> for Tick {
    fn from(raw: AggTradeRaw) -> Self {
        Tick {
            symbol: raw.symbol,
            price: raw.price,
            size: raw.qty,
            timestamp_ms: raw.timestamp_ms,
        }
    }
}

pub fn parse_message(text: &str) -> Result<ParsedMessage, serde_json::Error> {
    // Combined stream format carries a "stream" field.
    if text.contains("\"stream\"") {
        let wrapper: CombinedStreamWrapper = serde_json::from_str(text)?;
        if wrapper.data.event_type == "aggTrade" {
            return Ok(ParsedMessage::Tick(wrapper.data.into()));
        }
        return Ok(ParsedMessage::Unknown);
    }

    // Raw stream format.
    let raw: serde_json::Value = serde_json::from_str(text)?;
    if let Some(event_type) = raw.get("e").and_then(|v| v.as_str()) {
        if event_type == "aggTrade" {
            let trade: AggTradeRaw = serde_json::from_value(raw)?;
            return Ok(ParsedMessage::Tick(trade.into()));
        }
    }

    Ok(ParsedMessage::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_agg_trade() {
        let json = r#"{
            "e": "aggTrade",
            "E": 1672515782136,
            "s": "BTCUSDT",
            "a": 5933014,
            "p": "23456.78",
            "q": "0.001",
            "f": 100,
            "l": 105,
            "T": 1672515782136,
            "m": true
        }"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Tick(tick) => {
                assert_eq!(tick.symbol, "BTCUSDT");
                assert_eq!(tick.price.to_string(), "23456.78");
                assert_eq!(tick.size.to_string(), "0.001");
                assert_eq!(tick.timestamp_ms, 1672515782136);
            }
            ParsedMessage::Unknown => panic!("expected a tick"),
        }
    }

    #[test]
    fn test_parse_combined_stream_agg_trade() {
        let json = r#"{
            "stream": "btcusdt@aggTrade",
            "data": {
                "e": "aggTrade",
                "E": 1672515782136,
                "s": "BTCUSDT",
                "a": 5933014,
                "p": "23456.78",
                "q": "0.25",
                "T": 1672515782136,
                "m": false
            }
        }"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Tick(tick) => {
                assert_eq!(tick.symbol, "BTCUSDT");
                assert_eq!(tick.size.to_string(), "0.25");
            }
            ParsedMessage::Unknown => panic!("expected a tick"),
        }
    }

    #[test]
    fn test_other_events_ignored() {
        let json = r#"{"e": "markPriceUpdate", "s": "BTCUSDT", "p": "23456.78"}"#;
        assert!(matches!(
            parse_message(json).unwrap(),
            ParsedMessage::Unknown
        ));
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(parse_message("not json").is_err());
    }
}
