//! Technical indicators module
//!
//! Computes the indicator bundle of a snapshot from the rolling candle
//! window. Every function here is pure and degrades to neutral values when
//! the window is too short; none of them fail.

pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod zscore;

pub use macd::{MacdState, MacdTrend, PhaseStats};
pub use momentum::Momentum;
pub use zscore::ZScores;

use crate::data::{Candle, Frequency};
use serde::{Deserialize, Serialize};

/// Indicator parameters for one frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_span: usize,
    /// Closes fed to RSI
    pub rsi_window: usize,
    pub zscore_span: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Closes fed to MACD
    pub macd_window: usize,
    pub momentum_span: usize,
    pub momentum_tail: usize,
}

impl IndicatorParams {
    pub fn for_frequency(frequency: Frequency) -> Self {
        Self {
            zscore_span: frequency.zscore_span(),
            ..Self::default()
        }
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_span: 14,
            rsi_window: 100,
            zscore_span: 60,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            macd_window: 100,
            momentum_span: 5,
            momentum_tail: 5,
        }
    }
}

/// Indicators of the subject candle (the last candle of the window)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBundle {
    /// 0..=100
    pub rsi: u32,
    pub zscore: ZScores,
    pub macd: MacdState,
    pub momentum: Momentum,
    pub wick_slope: f64,
    pub buy_ratio: f64,
}

impl IndicatorBundle {
    pub fn neutral() -> Self {
        Self {
            rsi: rsi::NEUTRAL_RSI,
            zscore: ZScores::default(),
            macd: MacdState::neutral(),
            momentum: Momentum::default(),
            wick_slope: 0.0,
            buy_ratio: 0.0,
        }
    }
}

fn tail<T>(values: &[T], len: usize) -> &[T] {
    &values[values.len().saturating_sub(len)..]
}

/// Compute the indicator bundle for the last candle of `series`.
///
/// `wick_prices` are the prices observed inside the subject candle's interval.
pub fn compute_indicators(
    series: &[Candle],
    wick_prices: &[f64],
    params: &IndicatorParams,
) -> IndicatorBundle {
    let Some(subject) = series.last() else {
        return IndicatorBundle::neutral();
    };

    let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = series.iter().map(|c| c.volume).collect();
    let buy_ratios: Vec<f64> = series.iter().map(|c| c.buy_ratio()).collect();

    IndicatorBundle {
        rsi: rsi::rsi(tail(&closes, params.rsi_window), params.rsi_span),
        zscore: ZScores {
            close: zscore::zscore(&closes, subject.close, params.zscore_span),
            volume: zscore::zscore(&volumes, subject.volume, params.zscore_span),
            buy_ratio: zscore::zscore(&buy_ratios, subject.buy_ratio(), params.zscore_span),
        },
        macd: macd::macd_state(
            tail(&closes, params.macd_window),
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        ),
        momentum: momentum::momentum(&closes, params.momentum_span, params.momentum_tail),
        wick_slope: momentum::wick_slope(wick_prices),
        buy_ratio: subject.buy_ratio(),
    }
}
