//! Evaluation cycles per frequency tier
//!
//! Each tier runs on its own timer and never overlaps itself. A cycle
//! refreshes candles, snapshots every pair, evaluates exits before entries
//! and applies the resulting intents through the ledger.

use crate::context::TradingContext;
use crate::data::{Candle, Frequency, SeriesKey};
use crate::portfolio::PositionId;
use crate::reports;
use crate::snapshot::Snapshot;
use crate::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of one cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub frequency: Option<Frequency>,
    pub opened: Vec<PositionId>,
    pub closed: Vec<PositionId>,
    /// Pairs skipped because of a transient failure
    pub skipped: Vec<String>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Candle chosen for a pair in this cycle
struct Subject {
    candle: Candle,
    /// Freshly closed: entries may be evaluated
    entries: bool,
}

pub struct CycleScheduler {
    ctx: Arc<TradingContext>,
    /// Open time of the newest closed candle already evaluated per series
    evaluated: Mutex<HashMap<SeriesKey, DateTime<Utc>>>,
}

impl CycleScheduler {
    pub fn new(ctx: Arc<TradingContext>) -> Self {
        Self {
            ctx,
            evaluated: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<TradingContext> {
        &self.ctx
    }

    /// Run one cycle of `frequency` now
    pub async fn run_cycle(&self, frequency: Frequency) -> CycleReport {
        self.run_cycle_at(frequency, Utc::now()).await
    }

    /// Run one cycle of `frequency` with an explicit clock
    pub async fn run_cycle_at(&self, frequency: Frequency, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport {
            frequency: Some(frequency),
            ..CycleReport::default()
        };
        let pairs = &self.ctx.config.pairs;

        let refreshed = join_all(
            pairs
                .iter()
                .map(|pair| self.ctx.feed.refresh_at(pair, frequency, now)),
        )
        .await;

        let mut subjects = Vec::new();
        for (pair, result) in pairs.iter().zip(refreshed) {
            if let Err(err) = result {
                warn!(pair = %pair, %frequency, "Candle refresh failed: {}", err);
                report.skipped.push(pair.clone());
                continue;
            }
            if let Some(subject) = self.pick_subject(pair, frequency).await {
                subjects.push(subject);
            }
        }

        let built = join_all(subjects.iter().map(|s| self.ctx.snapshots.build(&s.candle))).await;
        let mut snapshots: Vec<Snapshot> = Vec::new();
        let mut entry_snapshots: Vec<Snapshot> = Vec::new();
        for (subject, result) in subjects.iter().zip(built) {
            match result {
                Ok(snapshot) => {
                    if subject.entries {
                        self.mark_evaluated(&subject.candle).await;
                        entry_snapshots.push(snapshot.clone());
                    }
                    snapshots.push(snapshot);
                }
                Err(err) => {
                    warn!(pair = %subject.candle.pair, %frequency, "Snapshot skipped: {}", err);
                    report.skipped.push(subject.candle.pair.clone());
                }
            }
        }
        if snapshots.is_empty() {
            return report;
        }

        let open = match self.ctx.ledger.open_positions().await {
            Ok(open) => open,
            Err(err) => {
                error!(%frequency, "Could not load open positions: {}", err);
                return report;
            }
        };

        let exits = self.ctx.evaluator.evaluate_exits(&open, &snapshots, frequency);
        for intent in exits.closes {
            match self
                .ctx
                .ledger
                .close(intent.position_id, &intent.snapshot, intent.reason, intent.detail)
                .await
            {
                Ok(id) => report.closed.push(id),
                Err(err) => warn!(position_id = %intent.position_id, "Close skipped: {}", err),
            }
        }
        for hold in exits.holds {
            if let Err(err) = self.ctx.ledger.update_stats(hold.position_id, &hold.snapshot).await {
                warn!(position_id = %hold.position_id, "Stats update skipped: {}", err);
            }
        }

        // Slots freed by this cycle's closes are not visible to its entries.
        let entries = self.ctx.evaluator.evaluate_entries(&entry_snapshots, &open);
        for intent in entries {
            let Some(strategy) = self.ctx.evaluator.strategy(&intent.strategy) else {
                continue;
            };
            match self.ctx.ledger.open(&intent.snapshot, strategy, intent.detail).await {
                Ok(id) => report.opened.push(id),
                Err(err) => warn!(
                    pair = %intent.snapshot.pair,
                    strategy = %intent.strategy,
                    "Open skipped: {}",
                    err
                ),
            }
        }

        report
    }

    /// Newest closed candle not yet evaluated, else the in-progress candle
    async fn pick_subject(&self, pair: &str, frequency: Frequency) -> Option<Subject> {
        let key = SeriesKey::new(pair, frequency);
        let series = self.ctx.candles.get(&key).await;
        let newest_closed = series.iter().rev().find(|c| c.closed);

        let evaluated = self.evaluated.lock().await;
        if let Some(candle) = newest_closed {
            let fresh = evaluated
                .get(&key)
                .map_or(true, |last| candle.open_time > *last);
            if fresh {
                return Some(Subject {
                    candle: candle.clone(),
                    entries: true,
                });
            }
        }

        series.last().filter(|c| !c.closed).map(|c| Subject {
            candle: c.clone(),
            entries: false,
        })
    }

    async fn mark_evaluated(&self, candle: &Candle) {
        let key = SeriesKey::new(&candle.pair, candle.frequency);
        self.evaluated.lock().await.insert(key, candle.open_time);
    }

    async fn run_tier(&self, frequency: Frequency, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.ctx.config.poll_interval(frequency));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(%frequency, "Frequency tier started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_cycle(frequency).await;
                    if !report.is_empty() {
                        info!(
                            %frequency,
                            opened = ?report.opened,
                            closed = ?report.closed,
                            "Cycle trades"
                        );
                    } else {
                        debug!(%frequency, skipped = report.skipped.len(), "Cycle complete");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        info!(%frequency, "Frequency tier stopped");
    }

    async fn run_reports(&self, mut shutdown: watch::Receiver<bool>) {
        let config = &self.ctx.config;
        let mut positions = tokio::time::interval(Duration::from_secs(config.positions_report_secs.max(1)));
        let mut earnings = tokio::time::interval(Duration::from_secs(config.earnings_report_secs.max(1)));
        positions.set_missed_tick_behavior(MissedTickBehavior::Skip);
        earnings.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let store = self.ctx.ledger.store();

        loop {
            tokio::select! {
                _ = positions.tick() => {
                    match reports::open_positions(&**store, Utc::now()).await {
                        Ok(report) => reports::log_open_positions(&report),
                        Err(err) => warn!("Positions report failed: {}", err),
                    }
                }
                _ = earnings.tick() => {
                    match reports::daily_earnings(&**store, Utc::now()).await {
                        Ok(report) => reports::log_earnings(&report),
                        Err(err) => warn!("Earnings report failed: {}", err),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Run every configured tier plus the report timers until `shutdown`
    /// flips. In-flight cycles finish before this returns.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let tiers = self
            .ctx
            .config
            .frequencies
            .iter()
            .map(|&frequency| self.run_tier(frequency, shutdown.clone()));

        tokio::join!(join_all(tiers), self.run_reports(shutdown.clone()));
        info!("Scheduler stopped");
        Ok(())
    }
}
