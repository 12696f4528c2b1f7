//! Futures REST API response types.

use execution_core::ExchangePosition;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Response from GET /fapi/v1/time.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// One entry from GET /fapi/v2/positionRisk.
///
/// The exchange sends every numeric field as a string; they deserialize
/// straight into `Decimal`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRiskResponse {
    pub symbol: String,
    #[serde(
        rename = "positionAmt",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub position_amt: Decimal,
    #[serde(
        rename = "entryPrice",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub entry_price: Decimal,
    #[serde(
        rename = "markPrice",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub mark_price: Decimal,
    #[serde(
        rename = "unRealizedProfit",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub unrealized_profit: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub leverage: Decimal,
}

impl From<PositionRiskResponse> for ExchangePosition {
    fn from(response: PositionRiskResponse) -> Self {
        Self {
            symbol: response.symbol,
            position_amt: response.position_amt,
            entry_price: response.entry_price,
            mark_price: response.mark_price,
            unrealized_pnl: response.unrealized_profit,
            leverage: response.leverage.to_u32().unwrap_or(1),
        }
    }
}

/// One entry from GET /fapi/v2/balance.
#[derive(Debug, Clone, Deserialize)]
pub struct FuturesBalanceResponse {
    pub asset: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub balance: Decimal,
    #[serde(
        rename = "availableBalance",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub available_balance: Decimal,
}

/// Response from POST /fapi/v1/order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderResponse {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    pub status: String,
    #[serde(rename = "avgPrice", deserialize_with = "deserialize_decimal_from_str")]
    pub avg_price: Decimal,
    #[serde(rename = "origQty", deserialize_with = "deserialize_decimal_from_str")]
    pub orig_qty: Decimal,
    #[serde(
        rename = "executedQty",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub executed_qty: Decimal,
    #[serde(rename = "updateTime")]
    pub update_time: i64,
}

/// Response from POST /fapi/v1/leverage.
#[derive(Debug, Clone, Deserialize)]
pub struct LeverageResponse {
    pub symbol: String,
    pub leverage: u32,
    #[serde(
        rename = "maxNotionalValue",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub max_notional_value: Decimal,
}

/// Deserialize a Decimal from a JSON string.
fn deserialize_decimal_from_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::PositionSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_server_time() {
        let json = r#"{"serverTime": 1499827319559}"#;
        let response: ServerTimeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.server_time, 1499827319559);
    }

    #[test]
    fn test_deserialize_position_risk() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "positionAmt": "-150.5",
            "entryPrice": "50012.34",
            "markPrice": "50100.00000000",
            "unRealizedProfit": "-13.21",
            "liquidationPrice": "64520.1",
            "leverage": "10",
            "marginType": "cross"
        }"#;

        let response: PositionRiskResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.position_amt, dec!(-150.5));
        assert_eq!(response.leverage, dec!(10));

        let position = ExchangePosition::from(response);
        assert_eq!(position.side(), PositionSide::Short);
        assert_eq!(position.size(), dec!(150.5));
        assert_eq!(position.entry_price, dec!(50012.34));
        assert_eq!(position.leverage, 10);
    }

    #[test]
    fn test_deserialize_flat_position() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "positionAmt": "0",
            "entryPrice": "0.0",
            "markPrice": "50100.00",
            "unRealizedProfit": "0.00000000",
            "leverage": "20"
        }"#;

        let position: ExchangePosition =
            serde_json::from_str::<PositionRiskResponse>(json).unwrap().into();
        assert_eq!(position.side(), PositionSide::Flat);
        assert_eq!(position.size(), Decimal::ZERO);
    }

    #[test]
    fn test_deserialize_balance() {
        let json = r#"[
            {"asset": "USDT", "balance": "1000.5", "availableBalance": "850.25"},
            {"asset": "BNB", "balance": "0.1", "availableBalance": "0.1"}
        ]"#;

        let balances: Vec<FuturesBalanceResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].asset, "USDT");
        assert_eq!(balances[0].available_balance, dec!(850.25));
    }

    #[test]
    fn test_deserialize_new_order() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": 4123456789,
            "clientOrderId": "bot_a1b2c3",
            "status": "FILLED",
            "avgPrice": "50001.20",
            "origQty": "100",
            "executedQty": "100",
            "cumQuote": "5000120",
            "type": "MARKET",
            "side": "BUY",
            "updateTime": 1700000000123
        }"#;

        let response: NewOrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.order_id, 4123456789);
        assert_eq!(response.status, "FILLED");
        assert_eq!(response.avg_price, dec!(50001.20));
    }
}
