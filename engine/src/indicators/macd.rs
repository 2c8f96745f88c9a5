//! MACD histogram and phase analysis

use crate::indicators::ema::{diff, ewm_last, finite_or};
use serde::{Deserialize, Serialize};
use std::fmt;
use ta::indicators::MovingAverageConvergenceDivergence;
use ta::Next;

/// Differences within this tolerance count as flat
const TREND_TOLERANCE: f64 = 1e-9;

/// Direction of the current histogram phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacdTrend {
    Upward,
    Downward,
    Flat,
}

impl fmt::Display for MacdTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MacdTrend::Upward => "UPWARD",
            MacdTrend::Downward => "DOWNWARD",
            MacdTrend::Flat => "FLAT",
        };
        f.write_str(s)
    }
}

/// Descriptive statistics of a phase's histogram values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub max: f64,
    pub mean: f64,
    pub min: f64,
}

/// MACD state of the subject candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdState {
    /// Histogram value of the subject candle
    pub value: f64,
    pub trend: MacdTrend,
    pub desc: PhaseStats,
    /// Number of bars in the current phase
    pub bars: usize,
    /// Smoothed slope of the current phase's amplitude
    pub amp_slope: f64,
}

impl MacdState {
    pub fn neutral() -> Self {
        Self {
            value: 0.0,
            trend: MacdTrend::Flat,
            desc: PhaseStats::default(),
            bars: 0,
            amp_slope: 0.0,
        }
    }
}

impl Default for MacdState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// MACD indicator wrapper producing the full histogram series
#[derive(Debug)]
pub struct MACD {
    inner: MovingAverageConvergenceDivergence,
}

impl MACD {
    /// Create new MACD indicator. Returns `None` for zero periods.
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Option<Self> {
        MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period)
            .ok()
            .map(|inner| Self { inner })
    }

    /// Histogram (MACD line minus signal line) for every close
    pub fn histogram(mut self, closes: &[f64]) -> Vec<f64> {
        closes.iter().map(|&c| self.inner.next(c).histogram).collect()
    }
}

/// Split a histogram into maximal runs of same-signed values.
///
/// Strictly positive values form positive phases; zero joins the negative side.
pub fn histogram_phases(histogram: &[f64]) -> Vec<&[f64]> {
    let mut phases = Vec::new();
    let mut start = 0;
    for i in 1..histogram.len() {
        if (histogram[i] > 0.0) != (histogram[i - 1] > 0.0) {
            phases.push(&histogram[start..i]);
            start = i;
        }
    }
    if start < histogram.len() {
        phases.push(&histogram[start..]);
    }
    phases
}

/// Classify the trend of `phase`, optionally anchored on the bar before it.
pub fn phase_trend(previous: Option<f64>, phase: &[f64]) -> MacdTrend {
    let mut values: Vec<f64> = previous.into_iter().collect();
    values.extend_from_slice(phase);
    let diffs = diff(&values);

    if diffs.is_empty() || diffs.iter().all(|d| d.abs() <= TREND_TOLERANCE) {
        MacdTrend::Flat
    } else if diffs.iter().all(|d| *d >= -TREND_TOLERANCE) {
        MacdTrend::Upward
    } else {
        MacdTrend::Downward
    }
}

/// MACD state of the last close in `closes`.
///
/// Needs at least two closes; shorter input yields the neutral state.
pub fn macd_state(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdState {
    if closes.len() < 2 {
        return MacdState::neutral();
    }
    let Some(macd) = MACD::new(fast, slow, signal) else {
        return MacdState::neutral();
    };

    let histogram = macd.histogram(closes);
    let phases = histogram_phases(&histogram);
    let Some(current) = phases.last().copied() else {
        return MacdState::neutral();
    };

    let previous = histogram.len().checked_sub(current.len() + 1).map(|i| histogram[i]);
    let value = current[current.len() - 1];
    let max = current.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = current.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = current.iter().sum::<f64>() / current.len() as f64;

    let amp_diffs = diff(current);
    let amp_span = current.len().min(3) as f64;
    let amp_slope = finite_or(ewm_last(&amp_diffs, amp_span), 0.0);

    MacdState {
        value: finite_or(value, 0.0),
        trend: phase_trend(previous, current),
        desc: PhaseStats {
            max: finite_or(max, 0.0),
            mean: finite_or(mean, 0.0),
            min: finite_or(min, 0.0),
        },
        bars: current.len(),
        amp_slope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_split() {
        let hist = [-1.0, -0.5, 0.0, 0.2, 0.4, -0.1];
        let phases = histogram_phases(&hist);
        assert_eq!(phases.len(), 3);
        assert_eq!(phases[0], &[-1.0, -0.5, 0.0]);
        assert_eq!(phases[1], &[0.2, 0.4]);
        assert_eq!(phases[2], &[-0.1]);
    }

    #[test]
    fn test_trend_classification() {
        assert_eq!(phase_trend(None, &[0.1, 0.2, 0.3]), MacdTrend::Upward);
        assert_eq!(phase_trend(Some(-0.1), &[0.3, 0.2]), MacdTrend::Downward);
        assert_eq!(phase_trend(None, &[0.5]), MacdTrend::Flat);
        assert_eq!(phase_trend(None, &[0.5, 0.5]), MacdTrend::Flat);
    }

    #[test]
    fn test_rising_closes_give_upward_phase_at_its_max() {
        let state = macd_state(&[100.0, 102.0, 104.0, 103.0, 105.0], 12, 26, 9);

        assert_eq!(state.trend, MacdTrend::Upward);
        assert!(state.value > 0.0);
        assert_eq!(state.value, state.desc.max);
        assert_eq!(state.bars, 4);
        assert!(state.amp_slope > 0.0);
    }

    #[test]
    fn test_falling_closes_give_downward_phase() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - (i as f64).powf(1.5)).collect();
        let state = macd_state(&closes, 12, 26, 9);

        assert!(state.value < 0.0);
        assert_eq!(state.trend, MacdTrend::Downward);
    }

    #[test]
    fn test_short_input_is_neutral() {
        assert_eq!(macd_state(&[100.0], 12, 26, 9), MacdState::neutral());
        assert_eq!(macd_state(&[100.0, 101.0], 0, 26, 9), MacdState::neutral());
    }
}
