//! MACD (Moving Average Convergence Divergence).
//!
//! MACD line = EMA(fast) - EMA(slow)
//! Signal line = EMA(signal) of the MACD line
//! Histogram = MACD line - signal line
//!
//! Warmup: the MACD line starts at max(fast, slow) - 1, the signal line and
//! histogram `signal - 1` bars later.

use crate::domain::indicator::{IndicatorError, exponential_smoothing, require_period};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub hist: Vec<Option<f64>>,
}

impl Macd {
    pub fn new(
        closes: &[f64],
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, IndicatorError> {
        require_period("MACD", fast_period, closes.len())?;
        require_period("MACD", slow_period, closes.len())?;
        require_period("MACD", signal_period, closes.len())?;

        let fast = exponential_smoothing(closes, 0, fast_period);
        let slow = exponential_smoothing(closes, 0, slow_period);
        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| f.zip(*s).map(|(f, s)| f - s))
            .collect();

        let line_start = fast_period.max(slow_period) - 1;
        let dense: Vec<f64> = macd.iter().map(|v| v.unwrap_or(0.0)).collect();
        let signal = exponential_smoothing(&dense, line_start, signal_period);

        let hist = macd
            .iter()
            .zip(&signal)
            .map(|(m, s)| m.zip(*s).map(|(m, s)| m - s))
            .collect();

        Ok(Macd {
            fast_period,
            slow_period,
            signal_period,
            macd,
            signal,
            hist,
        })
    }
}
