//! Process-wide trading context
//!
//! Owns the rolling candle store, the exchange handle and the components
//! built on them. Constructed once at startup and passed by reference to
//! the scheduler.

use crate::config::TradingConfig;
use crate::data::{CandleFeed, CandleStore};
use crate::error::EngineError;
use crate::exchange::ExchangeClient;
use crate::portfolio::PositionLedger;
use crate::snapshot::SnapshotBuilder;
use crate::store::PositionStore;
use crate::strategy::{StrategyDefinition, StrategyEvaluator};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;

pub struct TradingContext {
    pub config: TradingConfig,
    pub candles: Arc<CandleStore>,
    pub feed: CandleFeed,
    pub snapshots: SnapshotBuilder,
    pub evaluator: StrategyEvaluator,
    pub ledger: PositionLedger,
}

impl TradingContext {
    /// Build a context with the strategies named in `config`
    pub fn new(
        config: TradingConfig,
        exchange: Arc<dyn ExchangeClient>,
        store: Arc<dyn PositionStore>,
    ) -> Result<Self> {
        config.validate()?;
        let strategies = config.resolve_strategies()?;
        Self::with_strategies(config, exchange, store, strategies)
    }

    /// Build a context with explicit strategy definitions
    pub fn with_strategies(
        config: TradingConfig,
        exchange: Arc<dyn ExchangeClient>,
        store: Arc<dyn PositionStore>,
        strategies: Vec<StrategyDefinition>,
    ) -> Result<Self> {
        if config.pairs.is_empty() {
            return Err(EngineError::Config("No trading pairs enabled".to_string()));
        }
        if strategies.is_empty() {
            return Err(EngineError::Config("No strategies loaded".to_string()));
        }
        let mut names = HashSet::new();
        if let Some(dup) = strategies.iter().find(|s| !names.insert(s.name.as_str())) {
            return Err(EngineError::Config(format!("Duplicate strategy name: {}", dup.name)));
        }

        let candles = Arc::new(CandleStore::new(config.history_len));
        let feed = CandleFeed::new(
            Arc::clone(&exchange),
            Arc::clone(&candles),
            config.retry.clone(),
            config.history_len,
        );
        let snapshots = SnapshotBuilder::new(
            Arc::clone(&exchange),
            Arc::clone(&candles),
            config.retry.clone(),
        );
        let evaluator = StrategyEvaluator::new(Arc::new(strategies), config.max_open_positions);
        let ledger = PositionLedger::new(store, exchange, config.retry.clone(), config.ledger_settings());

        Ok(Self {
            config,
            candles,
            feed,
            snapshots,
            evaluator,
            ledger,
        })
    }
}
