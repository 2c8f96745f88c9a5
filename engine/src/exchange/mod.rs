//! Exchange integration module
//!
//! The engine only needs two reads from an exchange: the best bid/ask of a
//! pair and its klines. Orders are simulated against the best bid/ask.

pub mod binance;
pub mod retry;

pub use binance::*;
pub use retry::*;

use crate::data::Frequency;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Best bid/ask at the time of capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookTicker {
    pub bid_price: f64,
    pub bid_qty: f64,
    pub ask_price: f64,
    pub ask_qty: f64,
}

impl OrderBookTicker {
    /// Spread as a percentage of the bid: (ask - bid) / bid * 100
    pub fn spread_pct(&self) -> f64 {
        if self.bid_price > 0.0 {
            (self.ask_price - self.bid_price) / self.bid_price * 100.0
        } else {
            0.0
        }
    }
}

/// Read-only exchange collaborator
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Current best bid/ask for `pair`
    async fn get_order_book_ticker(&self, pair: &str) -> Result<OrderBookTicker>;

    /// Raw kline tuples, oldest first. May return fewer than `limit` rows or none.
    async fn get_klines(
        &self,
        pair: &str,
        interval: Frequency,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Value>>;
}
