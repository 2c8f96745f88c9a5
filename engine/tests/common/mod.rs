//! Shared fixtures: a scripted exchange and candle builders
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use engine::data::Frequency;
use engine::error::EngineError;
use engine::exchange::{ExchangeClient, OrderBookTicker, RetryPolicy};
use engine::prelude::*;
use engine::strategy::{EntryRules, ExitRules, StopLoss};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_100, 0).unwrap()
}

/// Exchange whose order book and klines are set by the test
#[derive(Default)]
pub struct MockExchange {
    book: Mutex<Option<OrderBookTicker>>,
    klines: Mutex<HashMap<(String, Frequency), Vec<Value>>>,
    pub book_calls: AtomicUsize,
}

impl MockExchange {
    pub fn with_book(bid: f64, ask: f64) -> Self {
        let exchange = Self::default();
        exchange.set_book(bid, ask);
        exchange
    }

    pub fn set_book(&self, bid: f64, ask: f64) {
        *self.book.lock().unwrap() = Some(book(bid, ask));
    }

    /// Every following book read fails
    pub fn fail_book(&self) {
        *self.book.lock().unwrap() = None;
    }

    pub fn push_klines(&self, pair: &str, frequency: Frequency, rows: Vec<Value>) {
        self.klines
            .lock()
            .unwrap()
            .entry((pair.to_string(), frequency))
            .or_default()
            .extend(rows);
    }

    pub fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn get_order_book_ticker(&self, _pair: &str) -> engine::Result<OrderBookTicker> {
        self.book_calls.fetch_add(1, Ordering::SeqCst);
        let book = *self.book.lock().unwrap();
        book.ok_or_else(|| EngineError::transient("get_order_book_ticker", "mock outage"))
    }

    async fn get_klines(
        &self,
        pair: &str,
        interval: Frequency,
        start_time: Option<DateTime<Utc>>,
        _end_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> engine::Result<Vec<Value>> {
        let klines = self.klines.lock().unwrap();
        let rows = klines
            .get(&(pair.to_string(), interval))
            .cloned()
            .unwrap_or_default();
        Ok(match start_time {
            Some(start) => rows
                .into_iter()
                .filter(|r| r[0].as_i64().unwrap() >= start.timestamp_millis())
                .take(limit)
                .collect(),
            None => {
                let skip = rows.len().saturating_sub(limit);
                rows.into_iter().skip(skip).collect()
            }
        })
    }
}

pub fn book(bid: f64, ask: f64) -> OrderBookTicker {
    OrderBookTicker {
        bid_price: bid,
        bid_qty: 1.0,
        ask_price: ask,
        ask_qty: 1.0,
    }
}

/// Closed candle number `index` of a series starting at `base_time()`
pub fn candle(pair: &str, frequency: Frequency, index: i64, close: f64) -> Candle {
    let open_time = base_time() + frequency.duration() * index as i32;
    Candle {
        pair: pair.to_string(),
        frequency,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10.0,
        buy_volume: 6.0,
        open_time,
        close_time: open_time + frequency.duration() - Duration::milliseconds(1),
        closed: true,
    }
}

pub fn series(pair: &str, frequency: Frequency, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| candle(pair, frequency, i as i64, close))
        .collect()
}

/// Binance kline tuple for candle number `index`
pub fn kline(frequency: Frequency, index: i64, close: f64) -> Value {
    let c = candle("", frequency, index, close);
    json!([
        c.open_time.timestamp_millis(),
        c.open.to_string(),
        c.high.to_string(),
        c.low.to_string(),
        c.close.to_string(),
        c.volume.to_string(),
        c.close_time.timestamp_millis(),
        "0",
        1,
        c.buy_volume.to_string(),
        "0",
        "0"
    ])
}

/// Snapshot of the last candle of `window`
pub fn snapshot(window: &[Candle], book: Option<OrderBookTicker>) -> Snapshot {
    let params = IndicatorParams::for_frequency(window[0].frequency);
    Snapshot::capture(window, &[], &params, book, Utc::now()).unwrap()
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        timeout_ms: 500,
        retries: 0,
        backoff_ms: 1,
    }
}

pub fn settings() -> LedgerSettings {
    LedgerSettings {
        trade_amount: rust_decimal_macros::dec!(0.05),
        fee_pct: rust_decimal_macros::dec!(0.05),
    }
}

/// Strategy trading only `frequency`, entering on every candle and exiting
/// when the close reaches `target`
pub fn threshold_strategy(name: &str, frequency: Frequency, target: f64) -> StrategyDefinition {
    StrategyDefinition {
        name: name.to_string(),
        stop_loss: StopLoss {
            frequencies: vec![frequency],
            pct: -0.75,
        },
        entry: EntryRules {
            filters: vec![engine::strategy::frequency_filter(&[frequency])],
            conditions: vec![Predicate::entry("close > 0", |c, _| Ok(c.close > 0.0))],
        },
        exit: ExitRules {
            filters: vec![engine::strategy::exit_frequency_filter(&[frequency])],
            conditions: vec![Predicate::exit("close >= target", move |c, _, _| {
                Ok(c.close >= target)
            })],
            failure: Vec::new(),
        },
    }
}
