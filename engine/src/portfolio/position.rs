//! Position (trade record) tracking

use crate::data::{Candle, Frequency};
use crate::exchange::OrderBookTicker;
use crate::portfolio::PositionStats;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Position ID, generated on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub Uuid);

impl PositionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PositionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Position status. CLOSED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "OPEN",
            PositionStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPEN" => Ok(PositionStatus::Open),
            "CLOSED" => Ok(PositionStatus::Closed),
            other => Err(format!("Unknown position status: {}", other)),
        }
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderAction {
    Buy,
    Sell,
}

/// Simulated execution against the best bid/ask. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub action: OrderAction,
    pub time: DateTime<Utc>,
    /// Ask for BUY, bid for SELL
    pub price: Decimal,
    /// Base asset volume
    pub volume: Decimal,
    /// Quote asset amount
    pub quote: Decimal,
    pub fee: Decimal,
    pub spread_pct: f64,
    pub slippage_pct: f64,
    pub book: OrderBookTicker,
    pub candle: Candle,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    Stoploss,
    Target,
    Failure,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Stoploss => "stoploss",
            ExitReason::Target => "target",
            ExitReason::Failure => "failure",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy section that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailSection {
    Entry,
    Stoploss,
    Target,
    Failure,
}

impl From<ExitReason> for DetailSection {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::Stoploss => DetailSection::Stoploss,
            ExitReason::Target => DetailSection::Target,
            ExitReason::Failure => DetailSection::Failure,
        }
    }
}

/// Record of one strategy decision on a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    pub strategy: String,
    pub section: DetailSection,
    /// Labels of the predicates that fired, or the stop-loss threshold
    pub description: Vec<String>,
}

/// Trade record
///
/// Holds exactly one BUY order (the first) and, once closed, exactly one
/// SELL order (the last). Snapshots and orders are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// Symbol (e.g., "ETHBTC")
    pub pair: String,
    pub frequency: Frequency,
    /// Strategy name
    pub strategy: String,
    pub status: PositionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    pub duration_secs: Option<i64>,
    /// Stop-loss threshold in percent (negative)
    pub stop_loss_pct: f64,
    pub snapshots: Vec<Snapshot>,
    pub orders: Vec<Order>,
    pub details: Vec<TradeDetail>,
    pub stats: Option<PositionStats>,
    pub pct_gain: Option<Decimal>,
    pub pct_net_gain: Option<Decimal>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// The BUY order
    pub fn entry_order(&self) -> Option<&Order> {
        self.orders.first().filter(|o| o.action == OrderAction::Buy)
    }

    /// The SELL order, once closed
    pub fn exit_order(&self) -> Option<&Order> {
        self.orders.last().filter(|o| o.action == OrderAction::Sell)
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.entry_order().map(|o| o.price)
    }

    /// Percent change from the entry price to `price`
    pub fn pct_change_to(&self, price: f64) -> Option<f64> {
        let entry = self.entry_price()?.to_f64()?;
        if entry > 0.0 {
            Some((price - entry) / entry * 100.0)
        } else {
            None
        }
    }

    /// Whether the order sequence holds one leading BUY and at most one
    /// trailing SELL matching the status
    pub fn orders_consistent(&self) -> bool {
        let buys = self.orders.iter().filter(|o| o.action == OrderAction::Buy).count();
        let sells = self.orders.iter().filter(|o| o.action == OrderAction::Sell).count();
        let expected_sells = match self.status {
            PositionStatus::Open => 0,
            PositionStatus::Closed => 1,
        };
        buys == 1 && self.entry_order().is_some() && sells == expected_sells
            && (sells == 0 || self.exit_order().is_some())
    }
}
