//! Technical indicator implementations.
//!
//! Every indicator takes the close-price vector (Ichimoku also needs nothing
//! more) and returns a result whose vectors are positionally aligned to the
//! input: index `i` belongs to candle `i`. Bars still inside the warm-up
//! window hold `None`.
//!
//! Constructors fail with [`IndicatorError`] instead of returning a partial
//! result when the period is zero or the input is too short.

pub mod bollinger;
pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::BBands;
pub use ema::Ema;
pub use ichimoku::Ichimoku;
pub use macd::Macd;
pub use rsi::Rsi;
pub use sma::Sma;

use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("{indicator}: period must be positive, got {period}")]
    InvalidPeriod {
        indicator: &'static str,
        period: usize,
    },

    #[error("BBANDS: multiplier must be positive, got {k}")]
    InvalidMultiplier { k: f64 },

    #[error("{indicator}: insufficient data, have {have} bars, need {need}")]
    InsufficientData {
        indicator: &'static str,
        have: usize,
        need: usize,
    },
}

/// Identity and parameters of a computed indicator, used in log lines and
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    BBands { n: usize, k: f64 },
    Ichimoku,
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::BBands { n, k } => write!(f, "BBANDS({},{})", n, k),
            IndicatorKind::Ichimoku => write!(f, "ICHIMOKU"),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Shared guard for SMA, EMA, RSI and the MACD periods: the period must be
/// positive and strictly shorter than the input.
pub(crate) fn require_period(
    indicator: &'static str,
    period: usize,
    len: usize,
) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator, period });
    }
    if len <= period {
        return Err(IndicatorError::InsufficientData {
            indicator,
            have: len,
            need: period + 1,
        });
    }
    Ok(())
}

/// Exponential smoothing of `values[start..]`, seeded with the simple mean
/// of the first `period` values. Output is aligned to `values`; entries
/// before `start + period - 1` are `None`.
pub(crate) fn exponential_smoothing(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || start + period > values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed_end = start + period - 1;
    let mut ema = values[start..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = Some(ema);

    for i in (seed_end + 1)..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}

/// Value of an aligned indicator vector at `at`, `None` when out of range or
/// still warming up.
pub fn value_at(values: &[Option<f64>], at: usize) -> Option<f64> {
    values.get(at).copied().flatten()
}
