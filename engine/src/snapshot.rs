//! Point-in-time market snapshots

use crate::data::{Candle, CandleStore, Frequency, SeriesKey};
use crate::exchange::{with_retry, ExchangeClient, OrderBookTicker, RetryPolicy};
use crate::indicators::{compute_indicators, IndicatorBundle, IndicatorParams};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Market and indicator state of one pair at one instant. Never mutated
/// after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: DateTime<Utc>,
    pub pair: String,
    pub frequency: Frequency,
    /// Subject candle
    pub candle: Candle,
    pub indicators: IndicatorBundle,
    /// Best bid/ask, `None` until fetched
    pub book: Option<OrderBookTicker>,
}

impl Snapshot {
    /// Assemble a snapshot from an already merged window ending at the
    /// subject candle.
    pub fn capture(
        window: &[Candle],
        wick_prices: &[f64],
        params: &IndicatorParams,
        book: Option<OrderBookTicker>,
        time: DateTime<Utc>,
    ) -> Option<Self> {
        let candle = window.last()?.clone();
        Some(Self {
            time,
            pair: candle.pair.clone(),
            frequency: candle.frequency,
            indicators: compute_indicators(window, wick_prices, params),
            candle,
            book,
        })
    }

    pub fn price(&self) -> f64 {
        self.candle.close
    }

    /// (ask - bid) / bid * 100
    pub fn spread_pct(&self) -> Option<f64> {
        self.book.map(|b| b.spread_pct())
    }

    /// (candle close - ask) / ask * 100
    pub fn slippage_pct(&self) -> Option<f64> {
        self.book.and_then(|b| {
            if b.ask_price > 0.0 {
                Some((self.candle.close - b.ask_price) / b.ask_price * 100.0)
            } else {
                None
            }
        })
    }
}

/// Builds snapshots from the rolling store plus a fresh order book read.
pub struct SnapshotBuilder {
    exchange: Arc<dyn ExchangeClient>,
    candles: Arc<CandleStore>,
    retry: RetryPolicy,
}

impl SnapshotBuilder {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        candles: Arc<CandleStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            exchange,
            candles,
            retry,
        }
    }

    /// Best bid/ask for `pair` under the retry policy
    pub async fn fetch_book(&self, pair: &str) -> Result<OrderBookTicker> {
        with_retry(&self.retry, "get_order_book_ticker", || {
            self.exchange.get_order_book_ticker(pair)
        })
        .await
    }

    /// Snapshot of `subject` for (pair, frequency).
    ///
    /// Records the subject's price as an intra-interval observation, computes
    /// indicators over the stored window ending at the subject and fetches
    /// the order book. A failed book fetch is returned as a transient error.
    pub async fn build(&self, subject: &Candle) -> Result<Snapshot> {
        let key = SeriesKey::new(&subject.pair, subject.frequency);
        let mut window = self.candles.window_until(&key, subject.open_time).await;
        if window.last().map(|c| c.open_time) != Some(subject.open_time) {
            window.push(subject.clone());
        } else if let Some(last) = window.last_mut() {
            *last = subject.clone();
        }

        let wick_prices = self.candles.observe_wick(subject).await;
        let params = IndicatorParams::for_frequency(subject.frequency);
        let book = self.fetch_book(&subject.pair).await?;

        Ok(Snapshot {
            time: Utc::now(),
            pair: subject.pair.clone(),
            frequency: subject.frequency,
            indicators: compute_indicators(&window, &wick_prices, &params),
            candle: subject.clone(),
            book: Some(book),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candle(close: f64) -> Candle {
        let open_time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Candle {
            pair: "ETHBTC".to_string(),
            frequency: Frequency::FiveMinutes,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            buy_volume: 0.5,
            open_time,
            close_time: open_time + Duration::minutes(5),
            closed: true,
        }
    }

    #[test]
    fn test_spread_and_slippage() {
        let book = OrderBookTicker {
            bid_price: 100.0,
            bid_qty: 1.0,
            ask_price: 101.0,
            ask_qty: 1.0,
        };
        let params = IndicatorParams::default();
        let ss = Snapshot::capture(&[candle(99.99)], &[], &params, Some(book), Utc::now()).unwrap();

        assert!((ss.spread_pct().unwrap() - 1.0).abs() < 1e-12);
        assert!((ss.slippage_pct().unwrap() - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_without_book() {
        let params = IndicatorParams::default();
        let ss = Snapshot::capture(&[candle(1.0)], &[], &params, None, Utc::now()).unwrap();
        assert!(ss.spread_pct().is_none());
        assert!(ss.slippage_pct().is_none());
        assert!(Snapshot::capture(&[], &[], &params, None, Utc::now()).is_none());
    }
}
