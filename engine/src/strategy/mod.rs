//! Strategy engine module
//!
//! Strategies are data: a name, a stop-loss rule and ordered lists of
//! labeled predicates for entry and exit. Predicates are pure functions of
//! their declared inputs and report failures as values.

pub mod evaluator;
pub mod presets;

pub use evaluator::*;
pub use presets::{all_presets, preset, MACD_PRESETS};

use crate::data::{Candle, Frequency};
use crate::error::EngineError;
use crate::portfolio::Position;
use crate::snapshot::Snapshot;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A predicate could not be evaluated
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PredicateError(pub String);

impl PredicateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type PredicateResult = std::result::Result<bool, PredicateError>;

/// Entry filter: applicability of a strategy to a candle
pub type CandleFn = dyn Fn(&Candle) -> PredicateResult + Send + Sync;
/// Entry condition
pub type EntryFn = dyn Fn(&Candle, &Snapshot) -> PredicateResult + Send + Sync;
/// Exit filter or condition
pub type ExitFn = dyn Fn(&Candle, &Snapshot, &Position) -> PredicateResult + Send + Sync;

/// A labeled predicate. The label is recorded in trade details.
pub struct Predicate<F: ?Sized> {
    pub label: String,
    func: Arc<F>,
}

impl<F: ?Sized> Clone for Predicate<F> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}

impl Predicate<CandleFn> {
    pub fn candle<G>(label: &str, func: G) -> Self
    where
        G: Fn(&Candle) -> PredicateResult + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn eval(&self, candle: &Candle) -> PredicateResult {
        (self.func)(candle)
    }
}

impl Predicate<EntryFn> {
    pub fn entry<G>(label: &str, func: G) -> Self
    where
        G: Fn(&Candle, &Snapshot) -> PredicateResult + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn eval(&self, candle: &Candle, snapshot: &Snapshot) -> PredicateResult {
        (self.func)(candle, snapshot)
    }
}

impl Predicate<ExitFn> {
    pub fn exit<G>(label: &str, func: G) -> Self
    where
        G: Fn(&Candle, &Snapshot, &Position) -> PredicateResult + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn eval(&self, candle: &Candle, snapshot: &Snapshot, position: &Position) -> PredicateResult {
        (self.func)(candle, snapshot, position)
    }
}

/// Entry filter passing only candles of the given frequencies
pub fn frequency_filter(frequencies: &[Frequency]) -> Predicate<CandleFn> {
    let allowed = frequencies.to_vec();
    let label = format!("freq in {}", frequency_list(&allowed));
    Predicate::candle(&label, move |c| Ok(allowed.contains(&c.frequency)))
}

/// Exit filter passing only candles of the given frequencies
pub fn exit_frequency_filter(frequencies: &[Frequency]) -> Predicate<ExitFn> {
    let allowed = frequencies.to_vec();
    let label = format!("freq in {}", frequency_list(&allowed));
    Predicate::exit(&label, move |c, _, _| Ok(allowed.contains(&c.frequency)))
}

fn frequency_list(frequencies: &[Frequency]) -> String {
    let names: Vec<&str> = frequencies.iter().map(|f| f.as_str()).collect();
    format!("[{}]", names.join(", "))
}

/// Stop-loss rule
#[derive(Debug, Clone, PartialEq)]
pub struct StopLoss {
    /// Cycle frequencies on which the rule is checked
    pub frequencies: Vec<Frequency>,
    /// Threshold in percent, e.g. -0.75
    pub pct: f64,
}

impl StopLoss {
    pub fn applies_to(&self, frequency: Frequency) -> bool {
        self.frequencies.contains(&frequency)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryRules {
    pub filters: Vec<Predicate<CandleFn>>,
    pub conditions: Vec<Predicate<EntryFn>>,
}

#[derive(Debug, Clone, Default)]
pub struct ExitRules {
    pub filters: Vec<Predicate<ExitFn>>,
    /// Target conditions
    pub conditions: Vec<Predicate<ExitFn>>,
    /// Failure conditions, may be empty
    pub failure: Vec<Predicate<ExitFn>>,
}

/// Immutable strategy definition; `name` is its unique key.
#[derive(Debug, Clone)]
pub struct StrategyDefinition {
    pub name: String,
    pub stop_loss: StopLoss,
    pub entry: EntryRules,
    pub exit: ExitRules,
}

impl StrategyDefinition {
    fn predicate_error(&self, label: &str, err: PredicateError) -> EngineError {
        EngineError::PredicateEvaluation {
            strategy: self.name.clone(),
            label: label.to_string(),
            message: err.0,
        }
    }

    /// True when every entry filter passes for `candle`
    pub fn entry_applies(&self, candle: &Candle) -> crate::Result<bool> {
        for filter in &self.entry.filters {
            if !filter.eval(candle).map_err(|e| self.predicate_error(&filter.label, e))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Labels of the entry conditions when all of them hold
    pub fn entry_fires(&self, candle: &Candle, snapshot: &Snapshot) -> crate::Result<Option<Vec<String>>> {
        all_hold(self, &self.entry.conditions, |p| p.eval(candle, snapshot))
    }

    /// True when every exit filter passes
    pub fn exit_applies(&self, candle: &Candle, snapshot: &Snapshot, position: &Position) -> crate::Result<bool> {
        for filter in &self.exit.filters {
            if !filter
                .eval(candle, snapshot, position)
                .map_err(|e| self.predicate_error(&filter.label, e))?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Labels of the target conditions when all of them hold
    pub fn target_fires(
        &self,
        candle: &Candle,
        snapshot: &Snapshot,
        position: &Position,
    ) -> crate::Result<Option<Vec<String>>> {
        all_hold(self, &self.exit.conditions, |p| p.eval(candle, snapshot, position))
    }

    /// Labels of the failure conditions when all of them hold
    pub fn failure_fires(
        &self,
        candle: &Candle,
        snapshot: &Snapshot,
        position: &Position,
    ) -> crate::Result<Option<Vec<String>>> {
        all_hold(self, &self.exit.failure, |p| p.eval(candle, snapshot, position))
    }
}

/// Evaluate every predicate; `Some(labels)` only when the list is non-empty
/// and all of them hold.
fn all_hold<F: ?Sized>(
    strategy: &StrategyDefinition,
    predicates: &[Predicate<F>],
    mut eval: impl FnMut(&Predicate<F>) -> PredicateResult,
) -> crate::Result<Option<Vec<String>>> {
    if predicates.is_empty() {
        return Ok(None);
    }
    let mut all = true;
    for predicate in predicates {
        let holds = eval(predicate).map_err(|e| strategy.predicate_error(&predicate.label, e))?;
        all &= holds;
    }
    Ok(all.then(|| predicates.iter().map(|p| p.label.clone()).collect()))
}
