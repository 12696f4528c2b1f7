//! Order sides, trade instructions and close reasons.

use model::PositionSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of an exchange order (not of a position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The order side that opens a position on `side`.
    ///
    /// Returns `None` for `Flat` (there is nothing to open).
    pub fn to_open(side: PositionSide) -> Option<Self> {
        match side {
            PositionSide::Long => Some(Self::Buy),
            PositionSide::Short => Some(Self::Sell),
            PositionSide::Flat => None,
        }
    }

    /// The order side that closes a position on `side`.
    pub fn to_close(side: PositionSide) -> Option<Self> {
        Self::to_open(side.opposite())
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// A market-style instruction handed to the executor.
///
/// `size` is quote-denominated notional; the margin actually reserved is
/// `size / leverage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub side: PositionSide,
    pub size: Decimal,
    pub leverage: u32,
    pub price: Decimal,
    pub signal_reason: String,
    pub timestamp_ms: i64,
}

impl TradeInstruction {
    /// Margin required to carry this instruction.
    pub fn required_margin(&self) -> Decimal {
        if self.leverage == 0 {
            return self.size;
        }
        self.size / Decimal::from(self.leverage)
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    FlipLong,
    FlipShort,
    TrailingStop,
    EmergencyStop,
    StopLoss,
    TakeProfit,
    RsiReversal,
    RsiFlatteningVolumeDrop,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlipLong => "flip-long",
            Self::FlipShort => "flip-short",
            Self::TrailingStop => "trailing-stop",
            Self::EmergencyStop => "emergency-stop",
            Self::StopLoss => "stop-loss",
            Self::TakeProfit => "take-profit",
            Self::RsiReversal => "rsi-reversal",
            Self::RsiFlatteningVolumeDrop => "rsi-flattening-volume-drop",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_mapping() {
        assert_eq!(OrderSide::to_open(PositionSide::Long), Some(OrderSide::Buy));
        assert_eq!(
            OrderSide::to_open(PositionSide::Short),
            Some(OrderSide::Sell)
        );
        assert_eq!(OrderSide::to_open(PositionSide::Flat), None);

        assert_eq!(
            OrderSide::to_close(PositionSide::Long),
            Some(OrderSide::Sell)
        );
        assert_eq!(
            OrderSide::to_close(PositionSide::Short),
            Some(OrderSide::Buy)
        );
    }

    #[test]
    fn test_required_margin() {
        let instruction = TradeInstruction {
            side: PositionSide::Long,
            size: dec!(100),
            leverage: 10,
            price: dec!(50000),
            signal_reason: "v1-long".to_string(),
            timestamp_ms: 0,
        };
        assert_eq!(instruction.required_margin(), dec!(10));
    }

    #[test]
    fn test_close_reason_strings() {
        assert_eq!(CloseReason::FlipLong.as_str(), "flip-long");
        assert_eq!(CloseReason::TrailingStop.as_str(), "trailing-stop");
        assert_eq!(
            CloseReason::RsiFlatteningVolumeDrop.as_str(),
            "rsi-flattening-volume-drop"
        );
    }
}
