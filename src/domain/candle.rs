//! OHLCV candle representation.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::error::TradebotError;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub product_code: String,
    pub duration: TimeDelta,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl Candle {
    /// Builds a candle, rejecting anything that is not a well-formed bar:
    /// `0 < low <= min(open, close) <= max(open, close) <= high`, positive
    /// volume and duration, non-empty product code.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_code: &str,
        duration: TimeDelta,
        time: DateTime<Utc>,
        open: f64,
        close: f64,
        high: f64,
        low: f64,
        volume: f64,
    ) -> Result<Self, TradebotError> {
        let invalid = |reason: &str| {
            Err(TradebotError::InvalidCandle {
                reason: reason.to_string(),
            })
        };

        if product_code.is_empty() {
            return invalid("product code is empty");
        }
        if duration <= TimeDelta::zero() {
            return invalid("duration must be positive");
        }
        // `!(x > 0.0)` also rejects NaN.
        for (name, value) in [
            ("open", open),
            ("close", close),
            ("high", high),
            ("low", low),
            ("volume", volume),
        ] {
            if !(value > 0.0) {
                return invalid(&format!("{name} must be positive, got {value}"));
            }
        }
        if high < low {
            return invalid("high is below low");
        }
        if high < open || high < close {
            return invalid("high is below open or close");
        }
        if low > open || low > close {
            return invalid("low is above open or close");
        }

        Ok(Candle {
            product_code: product_code.to_string(),
            duration,
            time,
            open,
            close,
            high,
            low,
            volume,
        })
    }

    /// Folds a newer observation of the same bar into this one.
    ///
    /// A `newer` candle at a different time starts a fresh bar and is
    /// returned as-is. Same time: open is kept, close and volume come from
    /// `newer`, high/low widen.
    pub fn merge(&self, newer: &Candle) -> Result<Candle, TradebotError> {
        if self.product_code != newer.product_code {
            return Err(TradebotError::InvalidCandle {
                reason: format!(
                    "cannot merge {} into {}",
                    newer.product_code, self.product_code
                ),
            });
        }
        if self.duration != newer.duration {
            return Err(TradebotError::InvalidCandle {
                reason: "cannot merge candles of different durations".into(),
            });
        }
        if self.time != newer.time {
            return Ok(newer.clone());
        }

        Candle::new(
            &self.product_code,
            self.duration,
            self.time,
            self.open,
            newer.close,
            self.high.max(newer.high),
            self.low.min(newer.low),
            newer.volume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> TimeDelta {
        TimeDelta::days(1)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_candle() -> Candle {
        Candle::new("BTC_JPY", day(), t0(), 3000.0, 3200.0, 3500.0, 2500.0, 100_000.0).unwrap()
    }

    #[test]
    fn valid_candle() {
        let c = sample_candle();
        assert_eq!(c.product_code, "BTC_JPY");
        assert_eq!(c.duration, day());
        assert_eq!(c.open, 3000.0);
        assert_eq!(c.close, 3200.0);
        assert_eq!(c.high, 3500.0);
        assert_eq!(c.low, 2500.0);
    }

    #[test]
    fn rejects_empty_product_code() {
        assert!(Candle::new("", day(), t0(), 3000.0, 3200.0, 3500.0, 2500.0, 1.0).is_err());
    }

    #[test]
    fn rejects_non_positive_duration() {
        let result = Candle::new("BTC_JPY", TimeDelta::zero(), t0(), 3000.0, 3200.0, 3500.0, 2500.0, 1.0);
        assert!(result.is_err());
        let result = Candle::new("BTC_JPY", -day(), t0(), 3000.0, 3200.0, 3500.0, 2500.0, 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_prices_and_volume() {
        assert!(Candle::new("BTC_JPY", day(), t0(), -3000.0, 3200.0, 3500.0, 2500.0, 1.0).is_err());
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, -3200.0, 3500.0, 2500.0, 1.0).is_err());
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, 3200.0, 0.0, 2500.0, 1.0).is_err());
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, 3200.0, 3500.0, 0.0, 1.0).is_err());
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, 3200.0, 3500.0, 2500.0, 0.0).is_err());
        assert!(Candle::new("BTC_JPY", day(), t0(), f64::NAN, 3200.0, 3500.0, 2500.0, 1.0).is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        // high < low
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, 3000.0, 2500.0, 3500.0, 1.0).is_err());
        // high < close
        assert!(Candle::new("BTC_JPY", day(), t0(), 3000.0, 3600.0, 3500.0, 2500.0, 1.0).is_err());
        // low > open
        assert!(Candle::new("BTC_JPY", day(), t0(), 2400.0, 3200.0, 3500.0, 2500.0, 1.0).is_err());
    }

    #[test]
    fn flat_candle_is_valid() {
        assert!(Candle::new("BTC_JPY", day(), t0(), 100.0, 100.0, 100.0, 100.0, 1.0).is_ok());
    }

    #[test]
    fn merge_same_bucket_widens_range() {
        let old = sample_candle();
        let newer = Candle::new("BTC_JPY", day(), t0(), 3300.0, 3300.0, 3700.0, 2400.0, 120_000.0).unwrap();
        let merged = old.merge(&newer).unwrap();

        assert_eq!(merged.open, 3000.0);
        assert_eq!(merged.close, 3300.0);
        assert_eq!(merged.high, 3700.0);
        assert_eq!(merged.low, 2400.0);
        assert_eq!(merged.volume, 120_000.0);
        assert_eq!(merged.time, t0());
    }

    #[test]
    fn merge_new_bucket_starts_fresh() {
        let old = sample_candle();
        let next_day = t0() + day();
        let newer = Candle::new("BTC_JPY", day(), next_day, 3300.0, 3300.0, 3300.0, 3300.0, 10.0).unwrap();
        let merged = old.merge(&newer).unwrap();
        assert_eq!(merged, newer);
    }

    #[test]
    fn merge_rejects_other_product() {
        let old = sample_candle();
        let newer = Candle::new("ETH_JPY", day(), t0(), 3300.0, 3300.0, 3300.0, 3300.0, 10.0).unwrap();
        assert!(old.merge(&newer).is_err());
    }

    #[test]
    fn merge_rejects_other_duration() {
        let old = sample_candle();
        let newer = Candle::new("BTC_JPY", TimeDelta::hours(1), t0(), 3300.0, 3300.0, 3300.0, 3300.0, 10.0).unwrap();
        assert!(old.merge(&newer).is_err());
    }
}
