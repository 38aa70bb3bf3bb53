//! Simple Moving Average.
//!
//! SMA[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are `None`.

use crate::domain::indicator::{IndicatorError, require_period};

#[derive(Debug, Clone, PartialEq)]
pub struct Sma {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

impl Sma {
    pub fn new(closes: &[f64], period: usize) -> Result<Self, IndicatorError> {
        require_period("SMA", period, closes.len())?;

        let mut values = vec![None; closes.len()];
        let mut sum = 0.0;
        for (i, close) in closes.iter().enumerate() {
            sum += close;
            if i >= period {
                sum -= closes[i - period];
            }
            if i + 1 >= period {
                values[i] = Some(sum / period as f64);
            }
        }

        Ok(Sma { period, values })
    }
}
