//! Position and earnings reports

use crate::data::Frequency;
use crate::portfolio::{PositionId, PositionStats};
use crate::store::{PositionFilter, PositionStore, StrategyEarnings};
use crate::Result;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// One OPEN position as shown in the periodic report
#[derive(Debug, Clone, Serialize)]
pub struct OpenPositionReport {
    pub id: PositionId,
    pub pair: String,
    pub strategy: String,
    pub frequency: Frequency,
    pub age_secs: i64,
    pub entry_price: Decimal,
    pub last_price: f64,
    /// Change from entry to last price, before fees
    pub unrealized_pct: f64,
    pub stats: Option<PositionStats>,
}

/// Current OPEN positions, oldest first
pub async fn open_positions(
    store: &dyn PositionStore,
    now: DateTime<Utc>,
) -> Result<Vec<OpenPositionReport>> {
    let positions = store.find_many(&PositionFilter::open()).await?;

    Ok(positions
        .into_iter()
        .filter_map(|p| {
            let entry_price = p.entry_price()?;
            let last_price = p
                .stats
                .map(|s| s.price.last)
                .or_else(|| p.snapshots.last().map(|s| s.candle.close))?;
            let entry = entry_price.to_f64()?;
            let unrealized_pct = if entry > 0.0 {
                (last_price - entry) / entry * 100.0
            } else {
                0.0
            };
            Some(OpenPositionReport {
                age_secs: (now - p.start_time).num_seconds(),
                id: p.id,
                pair: p.pair,
                strategy: p.strategy,
                frequency: p.frequency,
                entry_price,
                last_price,
                unrealized_pct,
                stats: p.stats,
            })
        })
        .collect())
}

/// Earnings of positions closed since 00:00 UTC of `now`'s day
pub async fn daily_earnings(
    store: &dyn PositionStore,
    now: DateTime<Utc>,
) -> Result<Vec<StrategyEarnings>> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now);
    store.aggregate_earnings(midnight, now + chrono::Duration::seconds(1)).await
}

pub fn log_open_positions(report: &[OpenPositionReport]) {
    info!(count = report.len(), "Open positions");
    for p in report {
        info!(
            position_id = %p.id,
            pair = %p.pair,
            strategy = %p.strategy,
            frequency = %p.frequency,
            age_secs = p.age_secs,
            entry_price = %p.entry_price,
            last_price = p.last_price,
            unrealized_pct = format!("{:+.2}", p.unrealized_pct),
            "Position"
        );
    }
}

pub fn log_earnings(report: &[StrategyEarnings]) {
    let total: Decimal = report.iter().map(|e| e.net_pct).sum();
    info!(strategies = report.len(), net_pct = %total, "Daily earnings");
    for e in report {
        info!(
            strategy = %e.strategy,
            trades = e.trades,
            wins = e.wins,
            losses = e.losses,
            net_pct = %e.net_pct,
            "Strategy earnings"
        );
    }
}
