//! Built-in strategy definitions

use crate::data::Frequency;
use crate::indicators::MacdTrend;
use crate::strategy::{
    exit_frequency_filter, frequency_filter, EntryRules, ExitRules, Predicate, StopLoss,
    StrategyDefinition,
};

/// Names of the MACD histogram strategies
pub const MACD_PRESETS: [&str; 4] = ["macd_1h_mean", "macd_5m_max", "macd_5m_mean", "macd_5m_uptrend"];

const STOP_LOSS_PCT: f64 = -0.75;

/// Exit condition of a MACD preset after the shared `value < 0` check
#[derive(Clone, Copy)]
enum MacdExit {
    BelowMean,
    BelowMax,
    Downward,
}

/// Entry on a rising positive phase at its peak so far
fn macd_entry(frequency: Frequency) -> EntryRules {
    EntryRules {
        filters: vec![frequency_filter(&[frequency])],
        conditions: vec![
            Predicate::entry("macd.value > 0", |_, ss| Ok(ss.indicators.macd.value > 0.0)),
            Predicate::entry("macd.value == macd.desc.max", |_, ss| {
                Ok(ss.indicators.macd.value == ss.indicators.macd.desc.max)
            }),
            Predicate::entry("macd.trend == UPWARD", |_, ss| {
                Ok(ss.indicators.macd.trend == MacdTrend::Upward)
            }),
        ],
    }
}

fn macd_exit(frequency: Frequency, rule: MacdExit) -> ExitRules {
    let second = match rule {
        MacdExit::BelowMean => Predicate::exit("macd.value < macd.desc.mean", |_, ss, _| {
            Ok(ss.indicators.macd.value < ss.indicators.macd.desc.mean)
        }),
        MacdExit::BelowMax => Predicate::exit("macd.value < macd.desc.max", |_, ss, _| {
            Ok(ss.indicators.macd.value < ss.indicators.macd.desc.max)
        }),
        MacdExit::Downward => Predicate::exit("macd.trend == DOWNWARD", |_, ss, _| {
            Ok(ss.indicators.macd.trend == MacdTrend::Downward)
        }),
    };

    ExitRules {
        filters: vec![exit_frequency_filter(&[frequency])],
        conditions: vec![
            Predicate::exit("macd.value < 0", |_, ss, _| Ok(ss.indicators.macd.value < 0.0)),
            second,
        ],
        failure: Vec::new(),
    }
}

fn macd_strategy(
    name: &str,
    frequency: Frequency,
    stop_frequencies: &[Frequency],
    rule: MacdExit,
) -> StrategyDefinition {
    StrategyDefinition {
        name: name.to_string(),
        stop_loss: StopLoss {
            frequencies: stop_frequencies.to_vec(),
            pct: STOP_LOSS_PCT,
        },
        entry: macd_entry(frequency),
        exit: macd_exit(frequency, rule),
    }
}

/// Buy deep below the mean on 1m, sell on the way back
fn zscore_1m_threshold() -> StrategyDefinition {
    StrategyDefinition {
        name: "zscore_1m_threshold".to_string(),
        stop_loss: StopLoss {
            frequencies: vec![Frequency::OneMinute],
            pct: STOP_LOSS_PCT,
        },
        entry: EntryRules {
            filters: vec![frequency_filter(&[Frequency::OneMinute])],
            conditions: vec![Predicate::entry("zscore.close < -3.0", |_, ss| {
                Ok(ss.indicators.zscore.close < -3.0)
            })],
        },
        exit: ExitRules {
            filters: vec![exit_frequency_filter(&[Frequency::OneMinute])],
            conditions: vec![
                Predicate::exit("zscore.close >= -0.75", |_, ss, _| {
                    Ok(ss.indicators.zscore.close >= -0.75)
                }),
                Predicate::exit("momentum <= 0.10", |_, ss, _| {
                    Ok(ss.indicators.momentum.last <= 0.10)
                }),
            ],
            failure: Vec::new(),
        },
    }
}

/// Buy confirmed 5m momentum on heavy buying, sell past the momentum peak
fn momentum_5m() -> StrategyDefinition {
    StrategyDefinition {
        name: "momentum_5m".to_string(),
        stop_loss: StopLoss {
            frequencies: vec![Frequency::FiveMinutes],
            pct: STOP_LOSS_PCT,
        },
        entry: EntryRules {
            filters: vec![frequency_filter(&[Frequency::FiveMinutes])],
            conditions: vec![
                Predicate::entry("momentum.tail(5).min >= 0", |_, ss| {
                    Ok(ss.indicators.momentum.is_bullish(5))
                }),
                Predicate::entry("zscore.volume >= 2.0", |_, ss| {
                    Ok(ss.indicators.zscore.volume >= 2.0)
                }),
                Predicate::entry("zscore.buy_ratio >= 0.5", |_, ss| {
                    Ok(ss.indicators.zscore.buy_ratio >= 0.5)
                }),
            ],
        },
        exit: ExitRules {
            filters: vec![exit_frequency_filter(&[Frequency::FiveMinutes])],
            conditions: vec![Predicate::exit("momentum < stats.momentum.max", |_, ss, pos| {
                Ok(pos
                    .stats
                    .map_or(false, |stats| ss.indicators.momentum.last < stats.momentum.max))
            })],
            failure: Vec::new(),
        },
    }
}

/// Preset by name
pub fn preset(name: &str) -> Option<StrategyDefinition> {
    use Frequency::{FiveMinutes, OneHour, OneMinute};

    let strategy = match name {
        "macd_1h_mean" => macd_strategy(name, OneHour, &[OneHour], MacdExit::BelowMean),
        "macd_5m_max" => macd_strategy(name, FiveMinutes, &[OneMinute, FiveMinutes], MacdExit::BelowMax),
        "macd_5m_mean" => macd_strategy(name, FiveMinutes, &[OneMinute, FiveMinutes], MacdExit::BelowMean),
        "macd_5m_uptrend" => {
            macd_strategy(name, FiveMinutes, &[OneMinute, FiveMinutes], MacdExit::Downward)
        }
        "zscore_1m_threshold" => zscore_1m_threshold(),
        "momentum_5m" => momentum_5m(),
        _ => return None,
    };
    Some(strategy)
}

/// Every built-in strategy
pub fn all_presets() -> Vec<StrategyDefinition> {
    MACD_PRESETS
        .iter()
        .chain(["zscore_1m_threshold", "momentum_5m"].iter())
        .filter_map(|name| preset(name))
        .collect()
}
