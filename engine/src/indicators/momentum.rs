//! EMA-smoothed percent change of close price

use crate::indicators::ema::{diff, ewm_last, ewm_mean, finite_or, pct_change};
use serde::{Deserialize, Serialize};

/// Momentum slope series of the subject candle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    /// Latest smoothed percent change
    pub last: f64,
    /// Most recent smoothed values, oldest first
    pub tail: Vec<f64>,
}

impl Momentum {
    /// Smallest value in the tail, 0.0 when empty
    pub fn tail_min(&self) -> f64 {
        if self.tail.is_empty() {
            return 0.0;
        }
        self.tail.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// True when a full tail of `len` samples never dipped below zero
    pub fn is_bullish(&self, len: usize) -> bool {
        len > 0 && self.tail.len() >= len && self.tail_min() >= 0.0
    }
}

/// Percent change of `closes` smoothed by an EWM of `span`, keeping the
/// last `tail_len` smoothed samples.
pub fn momentum(closes: &[f64], span: usize, tail_len: usize) -> Momentum {
    let smoothed: Vec<f64> = ewm_mean(&pct_change(closes), span as f64, 1)
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();

    let tail = smoothed[smoothed.len().saturating_sub(tail_len)..].to_vec();
    Momentum {
        last: smoothed.last().copied().unwrap_or(0.0),
        tail,
    }
}

/// Slope of prices observed within one candle interval: EWM (span = number
/// of observations) of successive differences, last value.
pub fn wick_slope(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    finite_or(ewm_last(&diff(prices), prices.len() as f64), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_prices_are_bullish() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let m = momentum(&closes, 5, 5);
        assert_eq!(m.tail.len(), 5);
        assert!(m.last > 0.0);
        assert!(m.is_bullish(5));
    }

    #[test]
    fn test_dip_in_tail_is_not_bullish() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.extend([100.0, 99.0]);
        let m = momentum(&closes, 5, 5);
        assert!(m.tail_min() < 0.0);
        assert!(!m.is_bullish(5));
    }

    #[test]
    fn test_short_history() {
        let m = momentum(&[100.0], 5, 5);
        assert_eq!(m.last, 0.0);
        assert!(m.tail.is_empty());
        assert!(!m.is_bullish(5));
    }

    #[test]
    fn test_wick_slope() {
        assert_eq!(wick_slope(&[]), 0.0);
        assert_eq!(wick_slope(&[10.0]), 0.0);
        assert!(wick_slope(&[10.0, 10.5, 11.0]) > 0.0);
        assert!(wick_slope(&[10.0, 9.0, 8.5]) < 0.0);
    }
}
