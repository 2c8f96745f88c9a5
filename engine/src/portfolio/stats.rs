//! Min/max/last indicator ranges across a position's lifetime

use crate::data::candle::round_to;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Range of one tracked value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRange {
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

impl IndicatorRange {
    fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            last: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last = value;
    }
}

/// Running stats of a position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionStats {
    pub buy_ratio: IndicatorRange,
    pub macd: IndicatorRange,
    pub macd_amp_slope: IndicatorRange,
    pub rsi: IndicatorRange,
    pub wick_slope: IndicatorRange,
    pub zscore: IndicatorRange,
    pub momentum: IndicatorRange,
    pub price: IndicatorRange,
}

/// Tracked values of one snapshot, in field order
fn tracked(ss: &Snapshot) -> [f64; 8] {
    let ind = &ss.indicators;
    [
        round_to(ind.buy_ratio, 2),
        round_to(ind.macd.value, 2),
        round_to(ind.macd.amp_slope, 2),
        ind.rsi as f64,
        round_to(ind.wick_slope, 2),
        round_to(ind.zscore.close, 2),
        round_to(ind.momentum.last, 2),
        ss.candle.close,
    ]
}

impl PositionStats {
    /// Stats over `snapshots` in order; `last` comes from the final one.
    /// `None` for an empty history.
    pub fn from_snapshots<'a, I>(snapshots: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut iter = snapshots.into_iter();
        let first = tracked(iter.next()?);
        let mut ranges = first.map(IndicatorRange::new);

        for ss in iter {
            for (range, value) in ranges.iter_mut().zip(tracked(ss)) {
                range.push(value);
            }
        }

        let [buy_ratio, macd, macd_amp_slope, rsi, wick_slope, zscore, momentum, price] = ranges;
        Some(Self {
            buy_ratio,
            macd,
            macd_amp_slope,
            rsi,
            wick_slope,
            zscore,
            momentum,
            price,
        })
    }
}
