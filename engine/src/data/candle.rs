//! OHLCV candle data structures

use crate::error::EngineError;
use crate::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::OneMinute,
        Frequency::FiveMinutes,
        Frequency::OneHour,
        Frequency::OneDay,
    ];

    /// Binance interval string
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneMinute => "1m",
            Frequency::FiveMinutes => "5m",
            Frequency::OneHour => "1h",
            Frequency::OneDay => "1d",
        }
    }

    /// Length of one interval
    pub fn duration(&self) -> Duration {
        match self {
            Frequency::OneMinute => Duration::minutes(1),
            Frequency::FiveMinutes => Duration::minutes(5),
            Frequency::OneHour => Duration::hours(1),
            Frequency::OneDay => Duration::days(1),
        }
    }

    /// Rolling window used for z-scores, also the indicator window length.
    pub fn zscore_span(&self) -> usize {
        match self {
            Frequency::OneMinute | Frequency::FiveMinutes => 60,
            Frequency::OneHour | Frequency::OneDay => 21,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Frequency::OneMinute),
            "5m" => Ok(Frequency::FiveMinutes),
            "1h" => Ok(Frequency::OneHour),
            "1d" => Ok(Frequency::OneDay),
            other => Err(EngineError::Config(format!("Unsupported frequency: {}", other))),
        }
    }
}

/// OHLCV candle data
///
/// A closed candle never changes. The in-progress candle of the current
/// interval is replaced on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Symbol (e.g., "BTCUSDT")
    pub pair: String,
    pub frequency: Frequency,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base asset volume
    pub volume: f64,
    /// Taker buy base asset volume
    pub buy_volume: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    /// True once the interval has elapsed
    pub closed: bool,
}

impl Candle {
    /// Taker buy share of volume, fixed to 4 decimal places.
    pub fn buy_ratio(&self) -> f64 {
        if self.volume > 0.0 {
            round_to(self.buy_volume / self.volume, 4)
        } else {
            0.0
        }
    }

    /// Parse one Binance kline tuple:
    /// `[open_time, open, high, low, close, volume, close_time, quote_vol,
    /// trades, buy_vol, buy_quote_vol, ignore]`
    pub fn from_kline(
        pair: &str,
        frequency: Frequency,
        row: &Value,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let fields = row
            .as_array()
            .ok_or_else(|| EngineError::Parse(format!("kline is not an array: {}", row)))?;
        if fields.len() < 10 {
            return Err(EngineError::Parse(format!(
                "kline has {} fields, expected at least 10",
                fields.len()
            )));
        }

        let open_time = parse_millis(&fields[0])?;
        let close_time = parse_millis(&fields[6])?;
        if close_time <= open_time {
            return Err(EngineError::Parse(format!(
                "kline close_time {} not after open_time {}",
                close_time, open_time
            )));
        }

        Ok(Self {
            pair: pair.to_string(),
            frequency,
            open: parse_number(&fields[1])?,
            high: parse_number(&fields[2])?,
            low: parse_number(&fields[3])?,
            close: parse_number(&fields[4])?,
            volume: parse_number(&fields[5])?,
            buy_volume: parse_number(&fields[9])?,
            open_time,
            close_time,
            closed: close_time < now,
        })
    }
}

/// Binance sends prices as strings and times as integers.
pub(crate) fn parse_number(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| EngineError::Parse(format!("bad number '{}': {}", s, e))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| EngineError::Parse(format!("bad number {}", n))),
        other => Err(EngineError::Parse(format!("expected number, got {}", other))),
    }
}

fn parse_millis(value: &Value) -> Result<DateTime<Utc>> {
    let millis = value
        .as_i64()
        .ok_or_else(|| EngineError::Parse(format!("expected millis, got {}", value)))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| EngineError::Parse(format!("timestamp out of range: {}", millis)))
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
