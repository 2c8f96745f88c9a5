//! Position store contract
//!
//! Document-style persistence of [`Position`] records: insert, lookup by
//! id or filter, atomic set + append updates and grouped earnings sums.

pub mod memory;

pub use memory::InMemoryPositionStore;

use crate::data::Frequency;
use crate::portfolio::{
    Order, Position, PositionId, PositionStats, PositionStatus, TradeDetail,
};
use crate::snapshot::Snapshot;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query over positions; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionFilter {
    pub pair: Option<String>,
    pub frequency: Option<Frequency>,
    pub status: Option<PositionStatus>,
    pub strategy: Option<String>,
}

impl PositionFilter {
    /// All OPEN positions
    pub fn open() -> Self {
        Self {
            status: Some(PositionStatus::Open),
            ..Self::default()
        }
    }

    pub fn pair(mut self, pair: &str) -> Self {
        self.pair = Some(pair.to_string());
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn strategy(mut self, strategy: &str) -> Self {
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn matches(&self, position: &Position) -> bool {
        self.pair.as_ref().map_or(true, |p| *p == position.pair)
            && self.frequency.map_or(true, |f| f == position.frequency)
            && self.status.map_or(true, |s| s == position.status)
            && self.strategy.as_ref().map_or(true, |s| *s == position.strategy)
    }
}

/// Field sets and array appends applied atomically to one position.
///
/// When `require_status` is set the update only applies while the stored
/// status still matches.
#[derive(Debug, Clone, Default)]
pub struct PositionUpdate {
    pub require_status: Option<PositionStatus>,
    pub status: Option<PositionStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub pct_gain: Option<Decimal>,
    pub pct_net_gain: Option<Decimal>,
    pub stats: Option<PositionStats>,
    pub push_snapshot: Option<Snapshot>,
    pub push_order: Option<Order>,
    pub push_detail: Option<TradeDetail>,
}

impl PositionUpdate {
    /// Apply to an in-memory record. Returns false when the status guard fails.
    pub fn apply(self, position: &mut Position) -> bool {
        if let Some(required) = self.require_status {
            if position.status != required {
                return false;
            }
        }
        if let Some(status) = self.status {
            position.status = status;
        }
        if let Some(end_time) = self.end_time {
            position.end_time = Some(end_time);
        }
        if let Some(duration) = self.duration_secs {
            position.duration_secs = Some(duration);
        }
        if let Some(gain) = self.pct_gain {
            position.pct_gain = Some(gain);
        }
        if let Some(net) = self.pct_net_gain {
            position.pct_net_gain = Some(net);
        }
        if let Some(stats) = self.stats {
            position.stats = Some(stats);
        }
        if let Some(snapshot) = self.push_snapshot {
            position.snapshots.push(snapshot);
        }
        if let Some(order) = self.push_order {
            position.orders.push(order);
        }
        if let Some(detail) = self.push_detail {
            position.details.push(detail);
        }
        true
    }
}

/// Closed-trade totals for one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEarnings {
    pub strategy: String,
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    /// Sum of pct_net_gain
    pub net_pct: Decimal,
}

/// Group closed positions by strategy, ordered by strategy name
pub fn summarize_earnings<'a, I>(positions: I) -> Vec<StrategyEarnings>
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut groups: BTreeMap<&str, StrategyEarnings> = BTreeMap::new();
    for position in positions {
        let Some(net) = position.pct_net_gain else {
            continue;
        };
        let entry = groups
            .entry(position.strategy.as_str())
            .or_insert_with(|| StrategyEarnings {
                strategy: position.strategy.clone(),
                trades: 0,
                wins: 0,
                losses: 0,
                net_pct: Decimal::ZERO,
            });
        entry.trades += 1;
        if net > Decimal::ZERO {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
        entry.net_pct += net;
    }
    groups.into_values().collect()
}

/// Persistence collaborator of the ledger
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn insert_one(&self, position: &Position) -> Result<PositionId>;

    async fn find_one(&self, id: &PositionId) -> Result<Option<Position>>;

    /// Matching positions ordered by start time
    async fn find_many(&self, filter: &PositionFilter) -> Result<Vec<Position>>;

    /// Returns false if the position is missing or the status guard failed
    async fn update_one(&self, id: &PositionId, update: PositionUpdate) -> Result<bool>;

    /// Earnings of positions closed within `[from, to)`, grouped by strategy
    async fn aggregate_earnings(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StrategyEarnings>>;
}
