//! Position ledger: the OPEN -> CLOSED state machine
//!
//! Orders are simulated against the best bid/ask. A BUY executes at the ask,
//! a SELL at the bid. Operations on the same position are serialized; the
//! at-most-one-OPEN-per-(pair, strategy) rule is the caller's
//! responsibility and is enforced by the evaluator's pre-check.

use crate::error::EngineError;
use crate::exchange::{with_retry, ExchangeClient, OrderBookTicker, RetryPolicy};
use crate::portfolio::{
    ExitReason, Order, OrderAction, Position, PositionId, PositionStats, PositionStatus,
    TradeDetail,
};
use crate::snapshot::Snapshot;
use crate::store::{PositionFilter, PositionStore, PositionUpdate};
use crate::strategy::StrategyDefinition;
use crate::Result;
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::iter;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Trade sizing and fees
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    /// Quote asset amount per trade
    pub trade_amount: Decimal,
    /// Exchange fee per order, in percent
    pub fee_pct: Decimal,
}

pub struct PositionLedger {
    store: Arc<dyn PositionStore>,
    exchange: Arc<dyn ExchangeClient>,
    retry: RetryPolicy,
    settings: LedgerSettings,
    locks: Mutex<HashMap<PositionId, Arc<Mutex<()>>>>,
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| EngineError::Parse(format!("{} is not representable: {}", field, value)))
}

fn slippage_pct(close: f64, price: f64) -> f64 {
    if price > 0.0 {
        (close - price) / price * 100.0
    } else {
        0.0
    }
}

impl PositionLedger {
    pub fn new(
        store: Arc<dyn PositionStore>,
        exchange: Arc<dyn ExchangeClient>,
        retry: RetryPolicy,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            exchange,
            retry,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn PositionStore> {
        &self.store
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub async fn open_positions(&self) -> Result<Vec<Position>> {
        self.store.find_many(&PositionFilter::open()).await
    }

    async fn lock_for(&self, id: PositionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    async fn release(&self, id: PositionId) {
        self.locks.lock().await.remove(&id);
    }

    /// Book captured in the snapshot, or a fresh read
    async fn book_for(&self, snapshot: &Snapshot) -> Result<OrderBookTicker> {
        if let Some(book) = snapshot.book {
            return Ok(book);
        }
        with_retry(&self.retry, "get_order_book_ticker", || {
            self.exchange.get_order_book_ticker(&snapshot.pair)
        })
        .await
    }

    /// Open a position for `strategy` at the snapshot's ask.
    ///
    /// Fails without side effects if the order book cannot be read.
    pub async fn open(
        &self,
        snapshot: &Snapshot,
        strategy: &StrategyDefinition,
        detail: TradeDetail,
    ) -> Result<PositionId> {
        let book = self.book_for(snapshot).await.map_err(|err| {
            warn!(pair = %snapshot.pair, strategy = %strategy.name, "BUY aborted: {}", err);
            err
        })?;

        let price = to_decimal(book.ask_price, "ask price")?;
        if price <= Decimal::ZERO {
            return Err(EngineError::InvariantViolation(format!(
                "Non-positive ask for {}: {}",
                snapshot.pair, price
            )));
        }

        let quote = self.settings.trade_amount;
        let now = Utc::now();
        let mut entry_snapshot = snapshot.clone();
        entry_snapshot.book = Some(book);

        let order = Order {
            action: OrderAction::Buy,
            time: now,
            price,
            volume: (quote / price).round_dp(8),
            quote,
            fee: quote * self.settings.fee_pct / Decimal::ONE_HUNDRED,
            spread_pct: book.spread_pct(),
            slippage_pct: slippage_pct(snapshot.candle.close, book.ask_price),
            book,
            candle: snapshot.candle.clone(),
        };

        let position = Position {
            id: PositionId::new(),
            pair: snapshot.pair.clone(),
            frequency: snapshot.frequency,
            strategy: strategy.name.clone(),
            status: PositionStatus::Open,
            start_time: now,
            end_time: None,
            duration_secs: None,
            stop_loss_pct: strategy.stop_loss.pct,
            stats: PositionStats::from_snapshots(iter::once(&entry_snapshot)),
            snapshots: vec![entry_snapshot],
            orders: vec![order],
            details: vec![detail],
            pct_gain: None,
            pct_net_gain: None,
        };

        let id = self.store.insert_one(&position).await?;
        info!(
            position_id = %id,
            pair = %position.pair,
            strategy = %position.strategy,
            price = %price,
            "BUY"
        );
        Ok(id)
    }

    /// Close an OPEN position at the snapshot's bid.
    ///
    /// If the order book cannot be read, or the position is no longer OPEN,
    /// nothing is written.
    pub async fn close(
        &self,
        id: PositionId,
        snapshot: &Snapshot,
        reason: ExitReason,
        detail: TradeDetail,
    ) -> Result<PositionId> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let position = self
            .store
            .find_one(&id)
            .await?
            .ok_or_else(|| EngineError::InvariantViolation(format!("Unknown position {}", id)))?;
        if !position.is_open() {
            return Err(EngineError::InvariantViolation(format!(
                "Close attempted on {} position {}",
                position.status, id
            )));
        }
        let entry = position.entry_order().cloned().ok_or_else(|| {
            EngineError::InvariantViolation(format!("Position {} has no BUY order", id))
        })?;

        let book = self.book_for(snapshot).await.map_err(|err| {
            warn!(position_id = %id, pair = %position.pair, "SELL aborted: {}", err);
            err
        })?;

        let bid = to_decimal(book.bid_price, "bid price")?;
        let fee_pct = self.settings.fee_pct;
        let pct_gain = ((bid - entry.price) / entry.price * Decimal::ONE_HUNDRED).round_dp(4);
        let pct_net_gain = pct_gain - fee_pct * Decimal::from(2);

        let now = Utc::now();
        let mut exit_snapshot = snapshot.clone();
        exit_snapshot.book = Some(book);

        let quote = (bid * entry.volume).round_dp(8);
        let order = Order {
            action: OrderAction::Sell,
            time: now,
            price: bid,
            volume: entry.volume,
            quote,
            fee: quote * fee_pct / Decimal::ONE_HUNDRED,
            spread_pct: book.spread_pct(),
            slippage_pct: slippage_pct(snapshot.candle.close, book.bid_price),
            book,
            candle: snapshot.candle.clone(),
        };

        let update = PositionUpdate {
            require_status: Some(PositionStatus::Open),
            status: Some(PositionStatus::Closed),
            end_time: Some(now),
            duration_secs: Some((now - position.start_time).num_seconds()),
            pct_gain: Some(pct_gain),
            pct_net_gain: Some(pct_net_gain),
            stats: PositionStats::from_snapshots(
                position.snapshots.iter().chain(iter::once(&exit_snapshot)),
            ),
            push_snapshot: Some(exit_snapshot),
            push_order: Some(order),
            push_detail: Some(detail),
        };

        if !self.store.update_one(&id, update).await? {
            return Err(EngineError::InvariantViolation(format!(
                "Position {} changed status during close",
                id
            )));
        }
        drop(_guard);
        self.release(id).await;

        info!(
            position_id = %id,
            pair = %position.pair,
            strategy = %position.strategy,
            reason = %reason,
            price = %bid,
            pct_net_gain = %pct_net_gain,
            "SELL"
        );
        Ok(id)
    }

    /// Recompute min/max/last stats over the position's history plus
    /// `snapshot` and persist them.
    ///
    /// The snapshot joins the permanent history only when its candle is
    /// closed and not already recorded, so repeating the call with the same
    /// snapshot gives the same stats.
    pub async fn update_stats(&self, id: PositionId, snapshot: &Snapshot) -> Result<PositionStats> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let position = self
            .store
            .find_one(&id)
            .await?
            .ok_or_else(|| EngineError::InvariantViolation(format!("Unknown position {}", id)))?;
        if !position.is_open() {
            return Err(EngineError::InvariantViolation(format!(
                "Stats update on {} position {}",
                position.status, id
            )));
        }

        let recorded = position.snapshots.iter().any(|s| {
            s.candle.closed && s.candle.open_time == snapshot.candle.open_time
                && s.frequency == snapshot.frequency
        });
        let pending = (!recorded).then_some(snapshot);
        let stats = PositionStats::from_snapshots(position.snapshots.iter().chain(pending))
            .ok_or_else(|| {
                EngineError::InvariantViolation(format!("Position {} has no snapshots", id))
            })?;

        let update = PositionUpdate {
            require_status: Some(PositionStatus::Open),
            stats: Some(stats),
            push_snapshot: (snapshot.candle.closed && !recorded).then(|| snapshot.clone()),
            ..PositionUpdate::default()
        };
        if !self.store.update_one(&id, update).await? {
            return Err(EngineError::InvariantViolation(format!(
                "Position {} closed during stats update",
                id
            )));
        }
        Ok(stats)
    }
}
