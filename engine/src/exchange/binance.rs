//! Binance spot REST client

use crate::data::Frequency;
use crate::error::EngineError;
use crate::exchange::{ExchangeClient, OrderBookTicker};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Binance caps klines per request
const MAX_KLINES_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerResponse {
    bid_price: String,
    bid_qty: String,
    ask_price: String,
    ask_qty: String,
}

impl BinanceClient {
    /// Create a client against `base_url` (e.g. https://api.binance.com)
    /// with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_price(field: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|e| EngineError::Parse(format!("{} '{}': {}", field, value, e)))
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn get_order_book_ticker(&self, pair: &str) -> Result<OrderBookTicker> {
        let response: BookTickerResponse = self
            .client
            .get(self.url("/api/v3/ticker/bookTicker"))
            .query(&[("symbol", pair)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(OrderBookTicker {
            bid_price: parse_price("bidPrice", &response.bid_price)?,
            bid_qty: parse_price("bidQty", &response.bid_qty)?,
            ask_price: parse_price("askPrice", &response.ask_price)?,
            ask_qty: parse_price("askQty", &response.ask_qty)?,
        })
    }

    async fn get_klines(
        &self,
        pair: &str,
        interval: Frequency,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let mut query: Vec<(&str, String)> = vec![
            ("symbol", pair.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES_LIMIT).to_string()),
        ];
        if let Some(start) = start_time {
            query.push(("startTime", start.timestamp_millis().to_string()));
        }
        if let Some(end) = end_time {
            query.push(("endTime", end.timestamp_millis().to_string()));
        }

        let rows: Vec<Value> = self
            .client
            .get(self.url("/api/v3/klines"))
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Fetched {} {} klines for {}", rows.len(), interval, pair);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = BinanceClient::new("https://api.binance.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url("/api/v3/klines"),
            "https://api.binance.com/api/v3/klines"
        );
    }

    #[test]
    fn test_book_ticker_payload() {
        let payload = r#"{"symbol":"ETHBTC","bidPrice":"0.05100000","bidQty":"3.2",
            "askPrice":"0.05102000","askQty":"1.0"}"#;
        let parsed: BookTickerResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parse_price("askPrice", &parsed.ask_price).unwrap(), 0.05102);
        assert!(parse_price("bidPrice", "n/a").is_err());
    }
}
