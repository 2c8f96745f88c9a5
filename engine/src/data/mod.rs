//! Data management module
//!
//! Handles candle parsing, kline polling and the rolling candle store.

pub mod candle;
pub mod feed;
pub mod storage;

pub use candle::{Candle, Frequency};
pub use feed::CandleFeed;
pub use storage::{CandleStore, SeriesKey};
