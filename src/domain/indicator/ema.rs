//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are `None`.

use crate::domain::indicator::{IndicatorError, exponential_smoothing, require_period};

#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

impl Ema {
    pub fn new(closes: &[f64], period: usize) -> Result<Self, IndicatorError> {
        require_period("EMA", period, closes.len())?;
        Ok(Ema {
            period,
            values: exponential_smoothing(closes, 0, period),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_warmup() {
        let ema = Ema::new(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();
        assert_eq!(ema.values.len(), 5);
        assert!(ema.values[0].is_none());
        assert!(ema.values[1].is_none());
        assert!(ema.values[2].is_some());
    }

    #[test]
    fn ema_seed_and_recurrence() {
        let ema = Ema::new(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();
        // seed = SMA(10, 20, 30) = 20, k = 0.5
        assert_relative_eq!(ema.values[2].unwrap(), 20.0);
        assert_relative_eq!(ema.values[3].unwrap(), 30.0);
        assert_relative_eq!(ema.values[4].unwrap(), 40.0);
    }

    #[test]
    fn ema_constant_input_is_flat() {
        let closes = vec![42.0; 30];
        let ema = Ema::new(&closes, 10).unwrap();
        for v in ema.values.iter().skip(9) {
            assert_relative_eq!(v.unwrap(), 42.0);
        }
    }

    #[test]
    fn ema_guards() {
        assert!(Ema::new(&[1.0, 2.0, 3.0], 0).is_err());
        assert!(Ema::new(&[1.0, 2.0, 3.0], 3).is_err());
        assert!(Ema::new(&[], 1).is_err());
    }
}
