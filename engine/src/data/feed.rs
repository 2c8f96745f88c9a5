//! Kline polling into the rolling candle store

use crate::data::{Candle, CandleStore, Frequency, SeriesKey};
use crate::exchange::{with_retry, ExchangeClient, RetryPolicy};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Pulls klines for one (pair, frequency) at a time and merges them into
/// the shared [`CandleStore`].
///
/// The first refresh of a series backfills `history_len` candles; later
/// refreshes fetch from the newest stored open time onwards.
pub struct CandleFeed {
    exchange: Arc<dyn ExchangeClient>,
    store: Arc<CandleStore>,
    retry: RetryPolicy,
    history_len: usize,
}

impl CandleFeed {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        store: Arc<CandleStore>,
        retry: RetryPolicy,
        history_len: usize,
    ) -> Self {
        Self {
            exchange,
            store,
            retry,
            history_len: history_len.max(1),
        }
    }

    pub fn store(&self) -> &Arc<CandleStore> {
        &self.store
    }

    /// Refresh the series for `pair` at `frequency`. Returns the number of
    /// candles added or replaced.
    pub async fn refresh(&self, pair: &str, frequency: Frequency) -> Result<usize> {
        self.refresh_at(pair, frequency, Utc::now()).await
    }

    /// Same as [`CandleFeed::refresh`] with an explicit clock, which decides
    /// which fetched candles count as closed.
    pub async fn refresh_at(
        &self,
        pair: &str,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let key = SeriesKey::new(pair, frequency);
        let (start_time, limit) = match self.store.last_open_time(&key).await {
            Some(last) => {
                let missed = (now - last).num_seconds() / frequency.duration().num_seconds().max(1);
                let limit = (missed.max(0) as usize + 2).min(self.history_len);
                (Some(last), limit)
            }
            None => (None, self.history_len),
        };

        let rows = with_retry(&self.retry, "get_klines", || {
            self.exchange
                .get_klines(pair, frequency, start_time, None, limit)
        })
        .await?;

        let candles = rows
            .iter()
            .map(|row| Candle::from_kline(pair, frequency, row, now))
            .collect::<Result<Vec<_>>>()?;

        let changed = self.store.merge(&key, candles).await;
        debug!(pair, %frequency, fetched = rows.len(), changed, "Merged klines");
        Ok(changed)
    }
}
