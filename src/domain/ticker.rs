//! Exchange ticker snapshots and their aggregation into daily candles.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::calendar::{TradeCalendar, parse_timestamp};
use crate::domain::candle::Candle;
use crate::domain::error::TradebotError;

#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub product_code: String,
    pub state: String,
    pub timestamp: DateTime<Utc>,
    pub tick_id: u64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub best_bid_size: f64,
    pub best_ask_size: f64,
    pub total_bid_depth: f64,
    pub total_ask_depth: f64,
    pub ltp: f64,
    pub volume: f64,
}

impl Ticker {
    /// `timestamp` is in the exchange layout (see [`parse_timestamp`]).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_code: &str,
        state: &str,
        timestamp: &str,
        tick_id: u64,
        best_bid: f64,
        best_ask: f64,
        best_bid_size: f64,
        best_ask_size: f64,
        total_bid_depth: f64,
        total_ask_depth: f64,
        ltp: f64,
        volume: f64,
    ) -> Result<Self, TradebotError> {
        let invalid = |reason: String| TradebotError::InvalidTicker { reason };

        if product_code.is_empty() {
            return Err(invalid("product code is empty".into()));
        }
        if state.is_empty() {
            return Err(invalid("state is empty".into()));
        }
        if timestamp.is_empty() {
            return Err(invalid("timestamp is empty".into()));
        }
        let timestamp = parse_timestamp(timestamp).map_err(|e| invalid(e.to_string()))?;

        for (name, value) in [("best_bid", best_bid), ("best_ask", best_ask), ("ltp", ltp)] {
            if !(value > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        for (name, value) in [
            ("best_bid_size", best_bid_size),
            ("best_ask_size", best_ask_size),
            ("total_bid_depth", total_bid_depth),
            ("total_ask_depth", total_ask_depth),
            ("volume", volume),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(format!("{name} must be non-negative, got {value}")));
            }
        }

        Ok(Ticker {
            product_code: product_code.to_string(),
            state: state.to_string(),
            timestamp,
            tick_id,
            best_bid,
            best_ask,
            best_bid_size,
            best_ask_size,
            total_bid_depth,
            total_ask_depth,
            ltp,
            volume,
        })
    }

    pub fn mid_price(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// Daily candle for the trading day containing the tick: OHLC at the mid
/// price, volume from the ticker.
pub fn ticker_to_candle(ticker: &Ticker, calendar: &TradeCalendar) -> Result<Candle, TradebotError> {
    let time = calendar
        .bucket(ticker.timestamp)
        .ok_or_else(|| TradebotError::InvalidTicker {
            reason: format!("cannot bucket {}", ticker.timestamp),
        })?;
    let price = ticker.mid_price();
    Candle::new(
        &ticker.product_code,
        TimeDelta::days(1),
        time,
        price,
        price,
        price,
        price,
        ticker.volume,
    )
}
