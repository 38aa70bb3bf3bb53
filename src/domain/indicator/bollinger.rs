//! Bollinger Bands.
//!
//! Middle: SMA over n closes. Upper/lower: middle ± k × stddev, where stddev
//! is the population standard deviation (divides by n).
//! Warmup: first (n-1) bars are `None`.

use crate::domain::indicator::IndicatorError;

#[derive(Debug, Clone, PartialEq)]
pub struct BBands {
    pub n: usize,
    pub k: f64,
    pub up: Vec<Option<f64>>,
    pub mid: Vec<Option<f64>>,
    pub down: Vec<Option<f64>>,
}

impl BBands {
    pub fn new(closes: &[f64], n: usize, k: f64) -> Result<Self, IndicatorError> {
        if n == 0 {
            return Err(IndicatorError::InvalidPeriod {
                indicator: "BBANDS",
                period: n,
            });
        }
        if !(k > 0.0) {
            return Err(IndicatorError::InvalidMultiplier { k });
        }
        if closes.len() < n {
            return Err(IndicatorError::InsufficientData {
                indicator: "BBANDS",
                have: closes.len(),
                need: n,
            });
        }

        let len = closes.len();
        let mut up = vec![None; len];
        let mut mid = vec![None; len];
        let mut down = vec![None; len];

        for i in (n - 1)..len {
            let window = &closes[i + 1 - n..=i];
            let mean = window.iter().sum::<f64>() / n as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n as f64;
            let width = k * variance.sqrt();

            up[i] = Some(mean + width);
            mid[i] = Some(mean);
            down[i] = Some(mean - width);
        }

        Ok(BBands {
            n,
            k,
            up,
            mid,
            down,
        })
    }
}
