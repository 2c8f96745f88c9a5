//! Z-score against an exponentially smoothed rolling window

use crate::data::candle::round_to;
use crate::indicators::ema::{ewm_mean, mean, std_dev};
use serde::{Deserialize, Serialize};

/// Per-field z-scores of the subject candle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZScores {
    pub close: f64,
    pub volume: f64,
    pub buy_ratio: f64,
}

/// Number of standard deviations `value` lies from the mean of the EWM
/// (span = `span`) of the last `span` samples of `series`, to 2 dp.
///
/// Returns 0.0 when the series is shorter than `span` or has no spread.
pub fn zscore(series: &[f64], value: f64, span: usize) -> f64 {
    if span < 2 || series.len() < span || !value.is_finite() {
        return 0.0;
    }

    let window = &series[series.len() - span..];
    let ema = ewm_mean(window, span as f64, 1);
    let sd = std_dev(&ema);
    if !sd.is_finite() || sd <= f64::EPSILON {
        return 0.0;
    }

    let z = (value - mean(&ema)) / sd;
    if z.is_finite() {
        round_to(z, 2)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 / 3.0).sin() * 4.0).collect()
    }

    #[test]
    fn test_mean_of_smoothed_window_scores_zero() {
        let series = wave(80);
        let window = &series[series.len() - 60..];
        let center = mean(&ewm_mean(window, 60.0, 1));
        assert_eq!(zscore(&series, center, 60), 0.0);
    }

    #[test]
    fn test_sign_follows_distance_from_mean() {
        let series = wave(60);
        assert!(zscore(&series, 200.0, 60) > 0.0);
        assert!(zscore(&series, 0.0, 60) < 0.0);
    }

    #[test]
    fn test_degenerate_inputs_are_neutral() {
        assert_eq!(zscore(&[1.0, 2.0], 1.5, 60), 0.0);
        assert_eq!(zscore(&[3.0; 60], 10.0, 60), 0.0);
        assert_eq!(zscore(&wave(60), f64::NAN, 60), 0.0);
    }
}
