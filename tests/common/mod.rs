#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;
use tradebot::domain::candle::Candle;
use tradebot::domain::error::TradebotError;
use tradebot::domain::optimizer::{
    BBandsSpace, EmaSpace, FloatGrid, IntRange, MacdSpace, RsiSpace, SearchSpace,
};
use tradebot::domain::params::TradeParams;
use tradebot::domain::series::CandleSeries;
use tradebot::ports::data_port::CandleSource;

pub const PRODUCT: &str = "BTC_JPY";

pub struct MockCandleSource {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, product: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(product.to_string(), candles);
        self
    }

    pub fn with_error(mut self, product: &str, reason: &str) -> Self {
        self.errors.insert(product.to_string(), reason.to_string());
        self
    }
}

impl CandleSource for MockCandleSource {
    fn fetch_candles(
        &self,
        product_code: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>, TradebotError> {
        if let Some(reason) = self.errors.get(product_code) {
            return Err(TradebotError::Data {
                reason: reason.clone(),
            });
        }
        let candles = self.data.get(product_code).cloned().unwrap_or_default();
        let skip = limit.map_or(0, |l| candles.len().saturating_sub(l));
        Ok(candles.into_iter().skip(skip).collect())
    }

    fn list_products(&self) -> Result<Vec<String>, TradebotError> {
        let mut products: Vec<String> = self.data.keys().cloned().collect();
        products.sort();
        Ok(products)
    }
}

pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(i as i64)
}

pub fn make_candle(product: &str, i: usize, close: f64) -> Candle {
    Candle::new(
        product,
        TimeDelta::days(1),
        day(i),
        close,
        close,
        close * 1.01,
        close * 0.99,
        10.0,
    )
    .unwrap()
}

pub fn candles_from_closes(product: &str, closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(product, i, c))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> CandleSeries {
    CandleSeries::new(PRODUCT, candles_from_closes(PRODUCT, closes)).unwrap()
}

/// A triangle wave between 1000 and 1000 + amplitude, `period` bars per leg.
pub fn zigzag(count: usize, period: usize, amplitude: f64) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let phase = i % (2 * period);
            let leg = if phase < period { phase } else { 2 * period - phase };
            1000.0 + amplitude * leg as f64 / period as f64
        })
        .collect()
}

pub fn basic_params() -> TradeParams {
    TradeParams::basic(PRODUCT, 1.0).unwrap()
}

/// A search space small enough for quick integration runs.
pub fn small_space() -> SearchSpace {
    SearchSpace {
        ema: EmaSpace {
            fast: IntRange::new(2, 4),
            slow: IntRange::new(6, 8),
        },
        bbands: BBandsSpace {
            n: IntRange::new(5, 7),
            k: FloatGrid::new(1.5, 0.5, 2),
        },
        rsi: RsiSpace {
            period: IntRange::new(3, 5),
            buy_threshold: FloatGrid::new(25.0, 5.0, 2),
            sell_threshold: FloatGrid::new(70.0, 5.0, 2),
        },
        macd: MacdSpace {
            fast: IntRange::new(3, 4),
            slow: IntRange::new(8, 9),
            signal: IntRange::new(3, 4),
        },
    }
}

pub fn write_candle_csv(dir: &Path, product: &str, closes: &[f64]) {
    let mut content = String::from("time,open,high,low,close,volume\n");
    for (i, &c) in closes.iter().enumerate() {
        content.push_str(&format!(
            "{},{},{},{},{},10\n",
            day(i).format("%Y-%m-%dT%H:%M:%S"),
            c,
            c * 1.01,
            c * 0.99,
            c
        ));
    }
    std::fs::write(dir.join(format!("{product}.csv")), content).unwrap();
}
