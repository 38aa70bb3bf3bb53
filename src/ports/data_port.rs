//! Candle history source.

use crate::domain::candle::Candle;
use crate::domain::error::TradebotError;

pub trait CandleSource {
    /// The most recent `limit` candles for `product_code`, oldest first.
    /// `None` returns the full history.
    fn fetch_candles(
        &self,
        product_code: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>, TradebotError>;

    fn list_products(&self) -> Result<Vec<String>, TradebotError>;
}
