//! Rolling candle dataset shared by the frequency tiers

use crate::data::{Candle, Frequency};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage key: one series per pair and frequency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub pair: String,
    pub frequency: Frequency,
}

impl SeriesKey {
    pub fn new(pair: &str, frequency: Frequency) -> Self {
        Self {
            pair: pair.to_string(),
            frequency,
        }
    }
}

/// Prices observed inside the current interval
#[derive(Debug, Default)]
struct Wick {
    open_time: Option<DateTime<Utc>>,
    prices: Vec<f64>,
}

/// In-memory rolling candle storage.
///
/// Each series is held behind an `Arc` and swapped whole on merge, so a
/// reader holding a series never sees a partially merged update.
#[derive(Debug)]
pub struct CandleStore {
    series: RwLock<HashMap<SeriesKey, Arc<Vec<Candle>>>>,
    wicks: RwLock<HashMap<SeriesKey, Wick>>,
    capacity: usize,
}

impl CandleStore {
    /// Create new storage keeping at most `capacity` candles per series
    pub fn new(capacity: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            wicks: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Merge fetched candles into the series for `key`.
    ///
    /// Candles with an unseen open time are inserted in order. A candle with
    /// a known open time replaces the stored one only while the stored one
    /// is still in progress. Returns the number of rows added or replaced.
    pub async fn merge(&self, key: &SeriesKey, candles: Vec<Candle>) -> usize {
        if candles.is_empty() {
            return 0;
        }

        let mut series = self.series.write().await;
        let current = series.get(key).cloned().unwrap_or_default();
        let mut rows: Vec<Candle> = (*current).clone();
        let mut changed = 0;

        for candle in candles {
            match rows.binary_search_by_key(&candle.open_time, |c| c.open_time) {
                Ok(idx) => {
                    if !rows[idx].closed && rows[idx] != candle {
                        rows[idx] = candle;
                        changed += 1;
                    }
                }
                Err(idx) => {
                    rows.insert(idx, candle);
                    changed += 1;
                }
            }
        }

        if rows.len() > self.capacity {
            let excess = rows.len() - self.capacity;
            rows.drain(..excess);
        }

        series.insert(key.clone(), Arc::new(rows));
        changed
    }

    /// Current series for `key` (oldest first)
    pub async fn get(&self, key: &SeriesKey) -> Arc<Vec<Candle>> {
        self.series
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Series truncated at (and including) the candle opened at `open_time`
    pub async fn window_until(&self, key: &SeriesKey, open_time: DateTime<Utc>) -> Vec<Candle> {
        let series = self.get(key).await;
        series
            .iter()
            .take_while(|c| c.open_time <= open_time)
            .cloned()
            .collect()
    }

    /// Open time of the newest stored candle
    pub async fn last_open_time(&self, key: &SeriesKey) -> Option<DateTime<Utc>> {
        self.get(key).await.last().map(|c| c.open_time)
    }

    /// Record the candle's price as an intra-interval observation and return
    /// all observations for its interval. A closed candle ends the interval,
    /// so its observations are cleared after being returned.
    pub async fn observe_wick(&self, candle: &Candle) -> Vec<f64> {
        let key = SeriesKey::new(&candle.pair, candle.frequency);
        let mut wicks = self.wicks.write().await;
        let wick = wicks.entry(key.clone()).or_default();

        if wick.open_time != Some(candle.open_time) {
            wick.open_time = Some(candle.open_time);
            wick.prices.clear();
        }
        wick.prices.push(candle.close);
        let prices = wick.prices.clone();

        if candle.closed {
            wicks.remove(&key);
        }
        prices
    }

    /// Number of stored candles across all series
    pub async fn len(&self) -> usize {
        self.series.read().await.values().map(|v| v.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candle(minute: i64, close: f64, closed: bool) -> Candle {
        let open_time = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(minute);
        Candle {
            pair: "BTCUSDT".to_string(),
            frequency: Frequency::OneMinute,
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
            buy_volume: 5.0,
            open_time,
            close_time: open_time + Duration::seconds(59),
            closed,
        }
    }

    #[tokio::test]
    async fn test_in_progress_candle_is_replaced() {
        let store = CandleStore::new(100);
        let key = SeriesKey::new("BTCUSDT", Frequency::OneMinute);

        store.merge(&key, vec![candle(0, 100.0, true), candle(1, 101.0, false)]).await;
        store.merge(&key, vec![candle(1, 102.0, false)]).await;

        let series = store.get(&key).await;
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, 102.0);
    }

    #[tokio::test]
    async fn test_closed_candle_is_immutable() {
        let store = CandleStore::new(100);
        let key = SeriesKey::new("BTCUSDT", Frequency::OneMinute);

        store.merge(&key, vec![candle(0, 100.0, true)]).await;
        let changed = store.merge(&key, vec![candle(0, 90.0, true)]).await;

        assert_eq!(changed, 0);
        assert_eq!(store.get(&key).await[0].close, 100.0);
    }

    #[tokio::test]
    async fn test_backfill_keeps_order_and_capacity() {
        let store = CandleStore::new(3);
        let key = SeriesKey::new("BTCUSDT", Frequency::OneMinute);

        store.merge(&key, vec![candle(2, 102.0, true), candle(3, 103.0, true)]).await;
        store.merge(&key, vec![candle(0, 100.0, true), candle(1, 101.0, true)]).await;

        let closes: Vec<f64> = store.get(&key).await.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![101.0, 102.0, 103.0]);
    }

    #[tokio::test]
    async fn test_window_until() {
        let store = CandleStore::new(10);
        let key = SeriesKey::new("BTCUSDT", Frequency::OneMinute);
        let subject = candle(1, 101.0, true);

        store
            .merge(&key, vec![candle(0, 100.0, true), subject.clone(), candle(2, 102.0, false)])
            .await;

        let window = store.window_until(&key, subject.open_time).await;
        assert_eq!(window.len(), 2);
        assert_eq!(window.last().unwrap().close, 101.0);
    }

    #[tokio::test]
    async fn test_wick_observations_reset_on_close() {
        let store = CandleStore::new(10);

        assert_eq!(store.observe_wick(&candle(0, 100.0, false)).await, vec![100.0]);
        assert_eq!(store.observe_wick(&candle(0, 101.0, false)).await, vec![100.0, 101.0]);
        assert_eq!(
            store.observe_wick(&candle(0, 102.0, true)).await,
            vec![100.0, 101.0, 102.0]
        );
        assert_eq!(store.observe_wick(&candle(1, 103.0, false)).await, vec![103.0]);
    }
}
