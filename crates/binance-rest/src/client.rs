//! Futures REST API client.

use crate::error::BinanceRestError;
use crate::responses::{
    FuturesBalanceResponse, LeverageResponse, NewOrderResponse, PositionRiskResponse,
    ServerTimeResponse,
};
use auth::{ApiCredentials, RequestSigner};
use common::BinanceEnvironment;
use execution_core::OrderSide;
use rest_client::{RestClient, RestError};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Request timeout for futures API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the signed USDⓈ-M futures endpoints.
pub struct BinanceFuturesClient {
    client: RestClient,
    credentials: ApiCredentials,
    environment: BinanceEnvironment,
    /// Offset between local clock and exchange clock (local - server).
    time_offset_ms: AtomicI64,
}

impl BinanceFuturesClient {
    /// Create a client for production.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built.
    pub fn new(credentials: ApiCredentials) -> Result<Self, BinanceRestError> {
        Self::with_environment(credentials, BinanceEnvironment::Production)
    }

    /// Create a client for a specific environment.
    pub fn with_environment(
        credentials: ApiCredentials,
        environment: BinanceEnvironment,
    ) -> Result<Self, BinanceRestError> {
        let client = RestClient::new(environment.rest_base_url(), REQUEST_TIMEOUT)?;

        Ok(Self {
            client,
            credentials,
            environment,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    pub fn environment(&self) -> BinanceEnvironment {
        self.environment
    }

    /// Estimated current server time, corrected by the measured offset.
    pub fn server_timestamp_ms(&self) -> i64 {
        common::now_ms() - self.time_offset_ms.load(Ordering::Relaxed)
    }

    /// Measure the offset between the local clock and the server clock.
    ///
    /// Call at startup, and again if signed requests start getting rejected
    /// for timestamps outside the receive window.
    pub async fn sync_time(&self) -> Result<(), BinanceRestError> {
        let before = std::time::Instant::now();
        let response: ServerTimeResponse = self
            .get("/fapi/v1/time", None, false)
            .await?;
        let rtt_ms = before.elapsed().as_millis() as i64;

        let local_ms = common::now_ms();
        // Estimate server time at the request midpoint.
        let estimated_server_ms = response.server_time + rtt_ms / 2;
        let offset = local_ms - estimated_server_ms;
        self.time_offset_ms.store(offset, Ordering::Relaxed);

        tracing::info!(
            server_time = response.server_time,
            offset_ms = offset,
            rtt_ms,
            "time synchronized with exchange"
        );
        Ok(())
    }

    /// Signed GET /fapi/v2/positionRisk for one symbol.
    ///
    /// The exchange answers with a list; a flat position still produces an
    /// entry with `positionAmt = "0"`.
    pub async fn get_position_risk(
        &self,
        symbol: &str,
    ) -> Result<Vec<PositionRiskResponse>, BinanceRestError> {
        let params = [("symbol", symbol)];
        self.signed_get("/fapi/v2/positionRisk", &params).await
    }

    /// Signed GET /fapi/v2/balance.
    pub async fn get_balances(&self) -> Result<Vec<FuturesBalanceResponse>, BinanceRestError> {
        self.signed_get("/fapi/v2/balance", &[]).await
    }

    /// Signed POST /fapi/v1/leverage.
    pub async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<LeverageResponse, BinanceRestError> {
        let leverage = leverage.to_string();
        let params = [("symbol", symbol), ("leverage", &leverage)];

        tracing::info!(symbol, leverage = %leverage, "setting leverage");
        self.signed_post("/fapi/v1/leverage", &params).await
    }

    /// Signed POST /fapi/v1/order for a MARKET order.
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        reduce_only: bool,
        client_order_id: &str,
    ) -> Result<NewOrderResponse, BinanceRestError> {
        let quantity = quantity.to_string();
        let mut params = vec![
            ("symbol", symbol),
            ("side", side.as_binance_str()),
            ("type", "MARKET"),
            ("quantity", &quantity),
            ("newClientOrderId", client_order_id),
            ("newOrderRespType", "RESULT"),
        ];
        if reduce_only {
            params.push(("reduceOnly", "true"));
        }

        tracing::info!(
            symbol,
            side = side.as_binance_str(),
            quantity = %quantity,
            reduce_only,
            client_order_id,
            "placing market order"
        );

        let response: NewOrderResponse = self.signed_post("/fapi/v1/order", &params).await?;

        tracing::info!(
            order_id = response.order_id,
            status = %response.status,
            avg_price = %response.avg_price,
            "order placed"
        );
        Ok(response)
    }

    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BinanceRestError> {
        let signer = RequestSigner::new(&self.credentials);
        let query = signer.signed_query(params, self.server_timestamp_ms());
        self.get(path, Some(&query), true).await
    }

    async fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BinanceRestError> {
        let signer = RequestSigner::new(&self.credentials);
        let query = signer.signed_query(params, self.server_timestamp_ms());
        let headers = [("X-MBX-APIKEY", self.credentials.api_key())];

        self.client
            .post(path, Some(&query), Some(&headers))
            .await
            .map_err(classify)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        authenticated: bool,
    ) -> Result<T, BinanceRestError> {
        let headers = [("X-MBX-APIKEY", self.credentials.api_key())];
        let headers = authenticated.then_some(&headers[..]);

        self.client.get(path, query, headers).await.map_err(classify)
    }
}

/// Turn HTTP-level errors carrying an exchange error body into typed
/// exchange errors.
fn classify(err: RestError) -> BinanceRestError {
    match err {
        RestError::HttpError { message, .. } if message.contains("\"code\"") => {
            BinanceRestError::from_api_response(&message)
        }
        other => BinanceRestError::Rest(other),
    }
}

impl std::fmt::Debug for BinanceFuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceFuturesClient")
            .field("environment", &self.environment)
            .field("base_url", &self.environment.rest_base_url())
            .field(
                "time_offset_ms",
                &self.time_offset_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_exchange_error_body() {
        let err = classify(RestError::HttpError {
            status: 400,
            message: r#"{"code":-2019,"msg":"Margin is insufficient."}"#.to_string(),
        });
        assert!(matches!(err, BinanceRestError::InsufficientMargin(_)));
    }

    #[test]
    fn test_classify_transport_error_passthrough() {
        let err = classify(RestError::Timeout);
        assert!(matches!(err, BinanceRestError::Rest(RestError::Timeout)));
    }
}
