//! Core domain types and logic: candles, indicators, the signal ledger,
//! backtesting and parameter search.

pub mod backtest;
pub mod calendar;
pub mod candle;
pub mod config;
pub mod error;
pub mod indicator;
pub mod optimizer;
pub mod params;
pub mod series;
pub mod signal;
pub mod signal_rules;
pub mod ticker;
pub mod trade;
