//! Analysis modules.
//!
//! Aggregates over the working table and the statistics behind them.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
