//! Portfolio management module
//!
//! Position records, their running stats and the ledger that opens and
//! closes them.

pub mod ledger;
pub mod position;
pub mod stats;

pub use ledger::{LedgerSettings, PositionLedger};
pub use position::*;
pub use stats::{IndicatorRange, PositionStats};
