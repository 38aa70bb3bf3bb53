//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of the first n gains/losses
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 * avg_gain / (avg_gain + avg_loss); a perfectly flat window
//! reads 0. Warmup: first n bars are `None`.

use crate::domain::indicator::{IndicatorError, require_period};

#[derive(Debug, Clone, PartialEq)]
pub struct Rsi {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        0.0
    } else {
        100.0 * avg_gain / total
    }
}

impl Rsi {
    pub fn new(closes: &[f64], period: usize) -> Result<Self, IndicatorError> {
        require_period("RSI", period, closes.len())?;

        let mut values = vec![None; closes.len()];
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;

        for i in 1..closes.len() {
            let change = closes[i] - closes[i - 1];
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if i <= period {
                avg_gain += gain;
                avg_loss += loss;
                if i == period {
                    avg_gain /= period as f64;
                    avg_loss /= period as f64;
                    values[i] = Some(rsi_from(avg_gain, avg_loss));
                }
            } else {
                let n = period as f64;
                avg_gain = (avg_gain * (n - 1.0) + gain) / n;
                avg_loss = (avg_loss * (n - 1.0) + loss) / n;
                values[i] = Some(rsi_from(avg_gain, avg_loss));
            }
        }

        Ok(Rsi { period, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rsi_warmup() {
        let rsi = Rsi::new(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert!(rsi.values[..3].iter().all(Option::is_none));
        assert!(rsi.values[3].is_some());
    }

    #[test]
    fn rising_prices_read_100() {
        let rsi = Rsi::new(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_relative_eq!(rsi.values[3].unwrap(), 100.0);
        assert_relative_eq!(rsi.values[4].unwrap(), 100.0);
    }

    #[test]
    fn falling_prices_read_0() {
        let rsi = Rsi::new(&[5.0, 4.0, 3.0, 2.0], 2).unwrap();
        assert_relative_eq!(rsi.values[2].unwrap(), 0.0);
        assert_relative_eq!(rsi.values[3].unwrap(), 0.0);
    }

    #[test]
    fn wilder_smoothing() {
        // changes: +2, -1, +1, -2
        let rsi = Rsi::new(&[10.0, 12.0, 11.0, 12.0, 10.0], 2).unwrap();
        // i=2: gain 1.0, loss 0.5 -> 66.67
        assert_relative_eq!(rsi.values[2].unwrap(), 100.0 * 1.0 / 1.5, epsilon = 1e-9);
        // i=3: gain (1+1)/2 = 1.0, loss (0.5+0)/2 = 0.25 -> 80
        assert_relative_eq!(rsi.values[3].unwrap(), 80.0, epsilon = 1e-9);
        // i=4: gain 0.5, loss (0.25+2)/2 = 1.125
        assert_relative_eq!(rsi.values[4].unwrap(), 100.0 * 0.5 / 1.625, epsilon = 1e-9);
    }

    #[test]
    fn rsi_is_bounded() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + ((i * 37) % 23) as f64).collect();
        let rsi = Rsi::new(&closes, 14).unwrap();
        for v in rsi.values.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn rsi_guards() {
        assert!(Rsi::new(&[1.0, 2.0], 0).is_err());
        assert!(Rsi::new(&[1.0, 2.0], 2).is_err());
    }
}
