//! Unit tests for indicators, candles and strategy presets

mod common;

use common::*;
use engine::indicators::{ema, macd, momentum, rsi, zscore};
use engine::prelude::*;
use serde_json::json;

#[test]
fn test_short_windows_are_neutral_and_finite() {
    for len in 0..4 {
        let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
        let bundle = compute_indicators(
            &series("BTCUSDT", Frequency::OneMinute, &closes),
            &[],
            &IndicatorParams::default(),
        );

        assert_eq!(bundle.rsi, rsi::NEUTRAL_RSI);
        assert!(bundle.zscore.close.is_finite());
        assert!(bundle.zscore.volume.is_finite());
        assert!(bundle.macd.value.is_finite());
        assert!(bundle.momentum.last.is_finite());
        assert_eq!(bundle.wick_slope, 0.0);
    }
}

#[test]
fn test_rsi_stays_in_bounds() {
    let zigzag: Vec<f64> = (0..60)
        .map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0)
        .collect();
    let value = rsi::rsi(&zigzag, 14);
    assert!(value <= 100);

    let rising: Vec<f64> = (0..30).map(|i| i as f64).collect();
    assert_eq!(rsi::rsi(&rising, 14), 100);
}

#[test]
fn test_zscore_of_flat_series_is_zero() {
    let flat = vec![5.0; 30];
    assert_eq!(zscore::zscore(&flat, 5.0, 20), 0.0);

    let mut spiked = vec![5.0, 6.0].repeat(15);
    spiked.push(20.0);
    assert!(zscore::zscore(&spiked, 20.0, 20) > 3.0);
}

#[test]
fn test_ewm_matches_adjusted_mean() {
    // span 3 -> alpha 0.5, weights 1, 0.5 for the last two samples
    let out = ema::ewm_mean(&[1.0, 2.0], 3.0, 1);
    assert!((out[1] - (2.0 + 0.5 * 1.0) / 1.5).abs() < 1e-12);
}

#[test]
fn test_macd_phases_split_on_sign() {
    let phases = macd::histogram_phases(&[-1.0, -0.5, 0.2, 0.4, -0.1]);
    assert_eq!(phases.len(), 3);
    assert_eq!(phases[1], &[0.2, 0.4]);
    assert_eq!(macd::phase_trend(Some(-0.5), &[0.2, 0.4]), MacdTrend::Upward);
    assert_eq!(macd::phase_trend(None, &[0.4, 0.2]), MacdTrend::Downward);
}

#[test]
fn test_momentum_tail() {
    let closes: Vec<f64> = (0..20).map(|i| 100.0 * 1.01f64.powi(i)).collect();
    let m = momentum::momentum(&closes, 5, 5);
    assert_eq!(m.tail.len(), 5);
    assert!(m.is_bullish(5));
    assert!(m.last > 0.0);
}

#[test]
fn test_kline_parsing_marks_closed_candles() {
    let row = kline(Frequency::FiveMinutes, 0, 101.5);
    let closed = Candle::from_kline(
        "ETHBTC",
        Frequency::FiveMinutes,
        &row,
        base_time() + Frequency::FiveMinutes.duration(),
    )
    .unwrap();
    assert!(closed.closed);
    assert_eq!(closed.close, 101.5);
    assert_eq!(closed.buy_ratio(), 0.6);

    let open = Candle::from_kline("ETHBTC", Frequency::FiveMinutes, &row, base_time()).unwrap();
    assert!(!open.closed);

    assert!(Candle::from_kline("ETHBTC", Frequency::FiveMinutes, &json!([1, "2"]), base_time()).is_err());
}

#[tokio::test]
async fn test_candle_store_keeps_closed_candles() {
    let store = CandleStore::new(3);
    let key = SeriesKey::new("ETHBTC", Frequency::OneMinute);
    let mut candles = series("ETHBTC", Frequency::OneMinute, &[1.0, 2.0, 3.0, 4.0]);
    candles[3].closed = false;
    store.merge(&key, candles.clone()).await;

    let stored = store.get(&key).await;
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].close, 2.0);

    // A closed candle is never replaced.
    let mut rewrite = candles[1].clone();
    rewrite.close = 99.0;
    assert_eq!(store.merge(&key, vec![rewrite]).await, 0);

    // The in-progress candle is.
    let mut finished = candles[3].clone();
    finished.close = 4.5;
    finished.closed = true;
    assert_eq!(store.merge(&key, vec![finished]).await, 1);
    assert_eq!(store.get(&key).await.last().unwrap().close, 4.5);
}

#[test]
fn test_presets_are_unique_and_resolvable() {
    let presets = all_presets();
    let mut names: Vec<&str> = presets.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), presets.len());
    assert!(preset("macd_1h_mean").is_some());
    assert!(preset("does_not_exist").is_none());
}
