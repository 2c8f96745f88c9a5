//! RSI (Relative Strength Index) indicator

use crate::indicators::ema::{diff, ewm_mean, mean};

/// Value reported while the window is shorter than the span
pub const NEUTRAL_RSI: u32 = 50;

/// RSI over smoothed close-to-close differences.
///
/// The differences are smoothed with an EWM of `span` (at least `span`
/// observations), only the last `span` smoothed values are kept, and
/// RS = |mean(gains) / mean(losses)|. When RS is undefined the result is
/// 0 if there were no gains, else 100.
pub fn rsi(closes: &[f64], span: usize) -> u32 {
    if span == 0 || closes.len() < span + 1 {
        return NEUTRAL_RSI;
    }

    let smoothed = ewm_mean(&diff(closes), span as f64, span);
    let tail = &smoothed[smoothed.len().saturating_sub(span)..];

    let gains: Vec<f64> = tail.iter().copied().filter(|d| *d > 0.0).collect();
    let losses: Vec<f64> = tail.iter().copied().filter(|d| *d < 0.0).collect();

    let rs = (mean(&gains) / mean(&losses)).abs();
    let value = 100.0 - 100.0 / (1.0 + rs);

    if value.is_nan() {
        if gains.is_empty() {
            0
        } else {
            100
        }
    } else {
        value.round().clamp(0.0, 100.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_gains() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14), 100);
    }

    #[test]
    fn test_all_losses() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&closes, 14), 0);
    }

    #[test]
    fn test_flat_series_has_no_gains() {
        assert_eq!(rsi(&[5.0; 30], 14), 0);
    }

    #[test]
    fn test_short_window_is_neutral() {
        assert_eq!(rsi(&[100.0, 101.0, 102.0], 14), NEUTRAL_RSI);
        assert_eq!(rsi(&[], 14), NEUTRAL_RSI);
    }

    #[test]
    fn test_mixed_series_is_bounded() {
        let closes: Vec<f64> = (0..100)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + (i % 7) as f64)
            .collect();
        let value = rsi(&closes, 14);
        assert!(value <= 100);
    }
}
