//! Configuration module

use crate::data::Frequency;
use crate::error::EngineError;
use crate::exchange::RetryPolicy;
use crate::portfolio::LedgerSettings;
use crate::strategy::{preset, StrategyDefinition, MACD_PRESETS};
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Engine parameters, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Enabled trading pairs (e.g., "ETHBTC")
    pub pairs: Vec<String>,
    /// Frequency tiers to run
    pub frequencies: Vec<Frequency>,
    /// Names of the strategies to load
    pub strategies: Vec<String>,
    /// Quote amount per trade
    pub trade_amount: Decimal,
    /// Exchange fee per order, in percent
    pub fee_pct: Decimal,
    /// Cap on simultaneously OPEN positions
    pub max_open_positions: usize,
    /// Exchange call timeout and retries
    pub retry: RetryPolicy,
    /// Candles kept per (pair, frequency)
    pub history_len: usize,
    /// Seconds between cycles of each tier
    pub poll_secs: BTreeMap<Frequency, u64>,
    pub positions_report_secs: u64,
    pub earnings_report_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            frequencies: vec![Frequency::OneMinute, Frequency::FiveMinutes, Frequency::OneHour],
            strategies: MACD_PRESETS.iter().map(|s| s.to_string()).collect(),
            trade_amount: Decimal::new(5, 2),
            fee_pct: Decimal::new(5, 2),
            max_open_positions: 10,
            retry: RetryPolicy::default(),
            history_len: 200,
            poll_secs: BTreeMap::from([
                (Frequency::OneMinute, 10),
                (Frequency::FiveMinutes, 30),
                (Frequency::OneHour, 60),
                (Frequency::OneDay, 300),
            ]),
            positions_report_secs: 60,
            earnings_report_secs: 600,
        }
    }
}

impl TradingConfig {
    /// Fails when nothing would be traded or sizing is invalid
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(EngineError::Config("No trading pairs enabled".to_string()));
        }
        if self.frequencies.is_empty() {
            return Err(EngineError::Config("No frequencies configured".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(EngineError::Config("No strategies loaded".to_string()));
        }
        if self.trade_amount <= Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "Trade amount must be positive, got {}",
                self.trade_amount
            )));
        }
        if self.fee_pct < Decimal::ZERO {
            return Err(EngineError::Config(format!(
                "Fee percentage must not be negative, got {}",
                self.fee_pct
            )));
        }
        Ok(())
    }

    /// Look up the configured strategies among the presets
    pub fn resolve_strategies(&self) -> Result<Vec<StrategyDefinition>> {
        self.strategies
            .iter()
            .map(|name| {
                preset(name).ok_or_else(|| EngineError::Config(format!("Unknown strategy: {}", name)))
            })
            .collect()
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            trade_amount: self.trade_amount,
            fee_pct: self.fee_pct,
        }
    }

    /// Cycle period of a tier; defaults to a sixth of the interval
    pub fn poll_interval(&self, frequency: Frequency) -> Duration {
        let secs = self
            .poll_secs
            .get(&frequency)
            .copied()
            .unwrap_or_else(|| (frequency.duration().num_seconds() / 6).max(1) as u64);
        Duration::from_secs(secs.max(1))
    }
}
