//! Trade parameters: per-family indicator settings plus order sizing and
//! the cut-loss threshold.

use crate::domain::error::TradebotError;

#[derive(Debug, Clone, PartialEq)]
pub struct SmaParams {
    pub enabled: bool,
    pub period1: usize,
    pub period2: usize,
    pub period3: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmaParams {
    pub enabled: bool,
    /// Fast line of the golden/dead cross.
    pub period1: usize,
    /// Slow line of the golden/dead cross.
    pub period2: usize,
    pub period3: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BBandsParams {
    pub enabled: bool,
    pub n: usize,
    pub k: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IchimokuParams {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiParams {
    pub enabled: bool,
    pub period: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdParams {
    pub enabled: bool,
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeParams {
    pub trade_enable: bool,
    pub product_code: String,
    pub size: f64,
    pub sma: SmaParams,
    pub ema: EmaParams,
    pub bbands: BBandsParams,
    pub ichimoku: IchimokuParams,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    /// Cut-loss distance below the entry price, in percent.
    pub stop_limit_percent: f64,
}

fn invalid(field: &str, reason: impl Into<String>) -> TradebotError {
    TradebotError::InvalidParams {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn require_positive_periods(family: &str, periods: &[usize]) -> Result<(), TradebotError> {
    if periods.iter().any(|&p| p == 0) {
        return Err(invalid(family, "periods must be positive"));
    }
    Ok(())
}

fn require_percent(field: &str, value: f64) -> Result<(), TradebotError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(field, format!("must be within [0, 100], got {value}")));
    }
    Ok(())
}

impl TradeParams {
    /// Default parameter set: every family enabled with textbook periods.
    pub fn basic(product_code: &str, size: f64) -> Result<Self, TradebotError> {
        let params = TradeParams {
            trade_enable: true,
            product_code: product_code.to_string(),
            size,
            sma: SmaParams {
                enabled: true,
                period1: 7,
                period2: 14,
                period3: 50,
            },
            ema: EmaParams {
                enabled: true,
                period1: 7,
                period2: 14,
                period3: 50,
            },
            bbands: BBandsParams {
                enabled: true,
                n: 20,
                k: 2.0,
            },
            ichimoku: IchimokuParams { enabled: true },
            rsi: RsiParams {
                enabled: true,
                period: 14,
                buy_threshold: 30.0,
                sell_threshold: 70.0,
            },
            macd: MacdParams {
                enabled: true,
                fast_period: 12,
                slow_period: 26,
                signal_period: 9,
            },
            stop_limit_percent: 0.75,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks every field; disabled families are not checked.
    pub fn validate(&self) -> Result<(), TradebotError> {
        if self.product_code.is_empty() {
            return Err(invalid("product_code", "must not be empty"));
        }
        if !(self.size >= 0.0) {
            return Err(invalid("size", format!("must be non-negative, got {}", self.size)));
        }
        if self.sma.enabled {
            require_positive_periods(
                "sma",
                &[self.sma.period1, self.sma.period2, self.sma.period3],
            )?;
        }
        if self.ema.enabled {
            require_positive_periods(
                "ema",
                &[self.ema.period1, self.ema.period2, self.ema.period3],
            )?;
        }
        if self.bbands.enabled {
            require_positive_periods("bbands_n", &[self.bbands.n])?;
            if !(self.bbands.k > 0.0) {
                return Err(invalid("bbands_k", format!("must be positive, got {}", self.bbands.k)));
            }
        }
        if self.rsi.enabled {
            require_positive_periods("rsi_period", &[self.rsi.period])?;
            require_percent("rsi_buy_threshold", self.rsi.buy_threshold)?;
            require_percent("rsi_sell_threshold", self.rsi.sell_threshold)?;
        }
        if self.macd.enabled {
            require_positive_periods(
                "macd",
                &[
                    self.macd.fast_period,
                    self.macd.slow_period,
                    self.macd.signal_period,
                ],
            )?;
        }
        require_percent("stop_limit_percent", self.stop_limit_percent)?;
        Ok(())
    }

    pub fn any_family_enabled(&self) -> bool {
        self.sma.enabled
            || self.ema.enabled
            || self.bbands.enabled
            || self.ichimoku.enabled
            || self.rsi.enabled
            || self.macd.enabled
    }
}
