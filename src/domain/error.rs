//! Domain error types.

use crate::domain::indicator::IndicatorError;
use crate::domain::signal::Side;

/// Top-level error type for tradebot.
#[derive(Debug, thiserror::Error)]
pub enum TradebotError {
    #[error("invalid candle: {reason}")]
    InvalidCandle { reason: String },

    #[error("invalid signal event: {reason}")]
    InvalidSignal { reason: String },

    #[error("invalid ticker: {reason}")]
    InvalidTicker { reason: String },

    #[error("invalid trade parameter {field}: {reason}")]
    InvalidParams { field: String, reason: String },

    #[error("{side} signal rejected: {reason}")]
    SignalRejected { side: Side, reason: String },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("trading is disabled for {product_code}")]
    TradeDisabled { product_code: String },

    #[error("optimization cancelled")]
    Cancelled,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no candles for {product_code}")]
    NoData { product_code: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradebotError> for std::process::ExitCode {
    fn from(err: &TradebotError) -> Self {
        let code: u8 = match err {
            TradebotError::Io(_) => 1,
            TradebotError::ConfigParse { .. }
            | TradebotError::ConfigMissing { .. }
            | TradebotError::ConfigInvalid { .. } => 2,
            TradebotError::Data { .. } | TradebotError::NoData { .. } => 3,
            TradebotError::InvalidCandle { .. }
            | TradebotError::InvalidSignal { .. }
            | TradebotError::InvalidTicker { .. }
            | TradebotError::InvalidParams { .. }
            | TradebotError::SignalRejected { .. }
            | TradebotError::TradeDisabled { .. } => 4,
            TradebotError::Indicator(_) | TradebotError::Cancelled => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_error_converts() {
        let err: TradebotError = IndicatorError::InvalidPeriod {
            indicator: "EMA",
            period: 0,
        }
        .into();
        assert!(matches!(err, TradebotError::Indicator(_)));
        assert_eq!(err.to_string(), "EMA: period must be positive, got 0");
    }

    #[test]
    fn rejected_signal_message() {
        let err = TradebotError::SignalRejected {
            side: Side::Sell,
            reason: "no open position".into(),
        };
        assert_eq!(err.to_string(), "SELL signal rejected: no open position");
    }

    #[test]
    fn config_missing_message() {
        let err = TradebotError::ConfigMissing {
            section: "params".into(),
            key: "product_code".into(),
        };
        assert_eq!(err.to_string(), "missing config key [params] product_code");
    }
}
