//! Entry and exit decisions
//!
//! The evaluator is pure: it reads snapshots and positions and returns
//! intents. Applying them is the ledger's job.

use crate::data::Frequency;
use crate::error::EngineError;
use crate::portfolio::{DetailSection, ExitReason, Position, PositionId, TradeDetail};
use crate::snapshot::Snapshot;
use crate::strategy::StrategyDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Open a position for (pair, strategy) at the snapshot
#[derive(Debug, Clone)]
pub struct OpenIntent {
    pub strategy: String,
    pub snapshot: Snapshot,
    pub detail: TradeDetail,
}

/// Close `position_id` at the snapshot
#[derive(Debug, Clone)]
pub struct CloseIntent {
    pub position_id: PositionId,
    pub strategy: String,
    pub reason: ExitReason,
    pub snapshot: Snapshot,
    pub detail: TradeDetail,
}

/// Keep `position_id` open, recording the snapshot for stats
#[derive(Debug, Clone)]
pub struct HoldIntent {
    pub position_id: PositionId,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Default)]
pub struct ExitEvaluation {
    pub closes: Vec<CloseIntent>,
    pub holds: Vec<HoldIntent>,
}

pub struct StrategyEvaluator {
    strategies: Arc<Vec<StrategyDefinition>>,
    max_open_positions: usize,
}

impl StrategyEvaluator {
    pub fn new(strategies: Arc<Vec<StrategyDefinition>>, max_open_positions: usize) -> Self {
        Self {
            strategies,
            max_open_positions,
        }
    }

    pub fn strategies(&self) -> &[StrategyDefinition] {
        &self.strategies
    }

    pub fn strategy(&self, name: &str) -> Option<&StrategyDefinition> {
        self.strategies.iter().find(|s| s.name == name)
    }

    /// Entry intents for every candidate snapshot and strategy.
    ///
    /// `open_positions` must be the current OPEN positions; a strategy that
    /// already holds a pair is skipped for that pair. Intents stop once the
    /// number of open positions plus accepted intents reaches the cap.
    pub fn evaluate_entries(&self, snapshots: &[Snapshot], open_positions: &[Position]) -> Vec<OpenIntent> {
        let mut held: HashMap<(&str, &str), usize> = HashMap::new();
        for position in open_positions.iter().filter(|p| p.is_open()) {
            *held
                .entry((position.pair.as_str(), position.strategy.as_str()))
                .or_default() += 1;
        }
        let mut open_count: usize = held.values().sum();
        let mut intents = Vec::new();

        for snapshot in snapshots {
            for strategy in self.strategies.iter() {
                match held
                    .get(&(snapshot.pair.as_str(), strategy.name.as_str()))
                    .copied()
                {
                    Some(1) => continue,
                    Some(n) if n > 1 => {
                        let err = EngineError::InvariantViolation(format!(
                            "{} OPEN positions for {} / {}",
                            n, snapshot.pair, strategy.name
                        ));
                        error!(pair = %snapshot.pair, strategy = %strategy.name, "{}", err);
                        continue;
                    }
                    _ => {}
                }

                match self.check_entry(strategy, snapshot) {
                    Ok(Some(labels)) => {
                        if open_count >= self.max_open_positions {
                            debug!(
                                pair = %snapshot.pair,
                                strategy = %strategy.name,
                                "Max open positions reached, entry skipped"
                            );
                            continue;
                        }
                        open_count += 1;
                        intents.push(OpenIntent {
                            strategy: strategy.name.clone(),
                            snapshot: snapshot.clone(),
                            detail: TradeDetail {
                                strategy: strategy.name.clone(),
                                section: DetailSection::Entry,
                                description: labels,
                            },
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(pair = %snapshot.pair, strategy = %strategy.name, "{}", err);
                    }
                }
            }
        }

        intents
    }

    fn check_entry(
        &self,
        strategy: &StrategyDefinition,
        snapshot: &Snapshot,
    ) -> crate::Result<Option<Vec<String>>> {
        if !strategy.entry_applies(&snapshot.candle)? {
            return Ok(None);
        }
        strategy.entry_fires(&snapshot.candle, snapshot)
    }

    /// Exit decisions for `positions` in a cycle of `frequency`.
    ///
    /// Each position is matched with the snapshot of its pair. Stop-loss is
    /// checked first whenever the cycle frequency is one of the strategy's
    /// stop-loss frequencies. Filters and conditions only run for positions
    /// opened at the cycle frequency.
    pub fn evaluate_exits(
        &self,
        positions: &[Position],
        snapshots: &[Snapshot],
        frequency: Frequency,
    ) -> ExitEvaluation {
        let mut evaluation = ExitEvaluation::default();

        for position in positions.iter().filter(|p| p.is_open()) {
            let Some(snapshot) = snapshots
                .iter()
                .find(|s| s.pair == position.pair && s.frequency == frequency)
            else {
                continue;
            };
            let Some(strategy) = self.strategy(&position.strategy) else {
                error!(
                    position_id = %position.id,
                    strategy = %position.strategy,
                    "Open position references an unknown strategy"
                );
                continue;
            };

            if let Some(intent) = self.check_stop_loss(strategy, position, snapshot) {
                evaluation.closes.push(intent);
                continue;
            }
            if position.frequency != frequency {
                continue;
            }

            match self.check_exit(strategy, position, snapshot) {
                Ok(Some((reason, labels))) => evaluation.closes.push(CloseIntent {
                    position_id: position.id,
                    strategy: strategy.name.clone(),
                    reason,
                    snapshot: snapshot.clone(),
                    detail: TradeDetail {
                        strategy: strategy.name.clone(),
                        section: reason.into(),
                        description: labels,
                    },
                }),
                Ok(None) => evaluation.holds.push(HoldIntent {
                    position_id: position.id,
                    snapshot: snapshot.clone(),
                }),
                Err(err) => {
                    warn!(position_id = %position.id, pair = %position.pair, "{}", err);
                    evaluation.holds.push(HoldIntent {
                        position_id: position.id,
                        snapshot: snapshot.clone(),
                    });
                }
            }
        }

        evaluation
    }

    fn check_stop_loss(
        &self,
        strategy: &StrategyDefinition,
        position: &Position,
        snapshot: &Snapshot,
    ) -> Option<CloseIntent> {
        if !strategy.stop_loss.applies_to(snapshot.frequency) {
            return None;
        }
        let change = position.pct_change_to(snapshot.candle.close)?;
        if change >= strategy.stop_loss.pct {
            return None;
        }

        Some(CloseIntent {
            position_id: position.id,
            strategy: strategy.name.clone(),
            reason: ExitReason::Stoploss,
            snapshot: snapshot.clone(),
            detail: TradeDetail {
                strategy: strategy.name.clone(),
                section: DetailSection::Stoploss,
                description: vec![format!("{:+.2}% < {:+.2}%", change, strategy.stop_loss.pct)],
            },
        })
    }

    fn check_exit(
        &self,
        strategy: &StrategyDefinition,
        position: &Position,
        snapshot: &Snapshot,
    ) -> crate::Result<Option<(ExitReason, Vec<String>)>> {
        let candle = &snapshot.candle;
        if !strategy.exit_applies(candle, snapshot, position)? {
            return Ok(None);
        }
        if let Some(labels) = strategy.target_fires(candle, snapshot, position)? {
            return Ok(Some((ExitReason::Target, labels)));
        }
        if let Some(labels) = strategy.failure_fires(candle, snapshot, position)? {
            return Ok(Some((ExitReason::Failure, labels)));
        }
        Ok(None)
    }
}
