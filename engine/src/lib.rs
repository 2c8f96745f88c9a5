//! Trade lifecycle engine
//!
//! Each evaluation cycle merges freshly observed candles into a rolling
//! dataset, captures a market snapshot per pair, evaluates strategy
//! predicate chains against snapshots and open positions, and opens or
//! closes simulated positions with fee and slippage accounting.
//!
//! # Features
//!
//! - **Data**: Binance kline parsing, rolling candle store, kline polling
//! - **Indicators**: RSI, z-score, MACD histogram phases, EMA momentum
//! - **Strategies**: strategies as data, with labeled pure predicates
//! - **Portfolio**: position records, running stats, the position ledger
//! - **Scheduler**: independent timers per frequency tier
//!
//! # Example
//!
//! ```no_run
//! use engine::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> engine::Result<()> {
//! let config = TradingConfig {
//!     pairs: vec!["ETHBTC".to_string()],
//!     ..TradingConfig::default()
//! };
//! let exchange = Arc::new(BinanceClient::new("https://api.binance.com", Duration::from_secs(5))?);
//! let store = Arc::new(InMemoryPositionStore::new());
//! let ctx = Arc::new(TradingContext::new(config, exchange, store)?);
//!
//! let scheduler = CycleScheduler::new(ctx);
//! let report = scheduler.run_cycle(Frequency::FiveMinutes).await;
//! println!("opened {:?}", report.opened);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod portfolio;
pub mod reports;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod strategy;

pub use error::EngineError;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::TradingConfig;
    pub use crate::context::TradingContext;
    pub use crate::data::{Candle, CandleFeed, CandleStore, Frequency, SeriesKey};
    pub use crate::error::EngineError;
    pub use crate::exchange::{BinanceClient, ExchangeClient, OrderBookTicker, RetryPolicy};
    pub use crate::indicators::{compute_indicators, IndicatorBundle, IndicatorParams, MacdTrend};
    pub use crate::portfolio::{
        ExitReason, LedgerSettings, Order, OrderAction, Position, PositionId, PositionLedger,
        PositionStats, PositionStatus, TradeDetail,
    };
    pub use crate::scheduler::{CycleReport, CycleScheduler};
    pub use crate::snapshot::{Snapshot, SnapshotBuilder};
    pub use crate::store::{InMemoryPositionStore, PositionFilter, PositionStore, PositionUpdate};
    pub use crate::strategy::{
        all_presets, preset, Predicate, PredicateError, StrategyDefinition, StrategyEvaluator,
    };
    pub use crate::Result;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
