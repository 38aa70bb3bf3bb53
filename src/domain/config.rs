//! Loading and validating the `[params]`, `[optimizer]` and `[calendar]`
//! config sections.

use std::str::FromStr;
use std::time::Duration;

use crate::domain::calendar::TradeCalendar;
use crate::domain::error::TradebotError;
use crate::domain::optimizer::SearchSpace;
use crate::domain::params::TradeParams;
use crate::ports::config_port::{ConfigPort, parse_bool};

pub const PARAMS_SECTION: &str = "params";
pub const OPTIMIZER_SECTION: &str = "optimizer";
pub const CALENDAR_SECTION: &str = "calendar";

/// How the optimizer should be run, from `[optimizer]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub space: SearchSpace,
    pub timeout: Option<Duration>,
    pub parallel: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            space: SearchSpace::wide(),
            timeout: None,
            parallel: true,
        }
    }
}

/// Builds [`TradeParams`] from `[params]`. `product_code` and `size` are
/// required; every other key falls back to [`TradeParams::basic`].
pub fn load_trade_params(config: &dyn ConfigPort) -> Result<TradeParams, TradebotError> {
    let s = PARAMS_SECTION;
    let product_code = required_string(config, s, "product_code")?;
    let size: f64 = match config.get_string(s, "size") {
        Some(raw) => parse_value(s, "size", &raw)?,
        None => {
            return Err(TradebotError::ConfigMissing {
                section: s.to_string(),
                key: "size".to_string(),
            });
        }
    };

    let mut p = TradeParams::basic(&product_code, size).map_err(|e| invalid(s, "size", e))?;

    p.trade_enable = read_flag(config, s, "trade_enable", p.trade_enable)?;
    p.stop_limit_percent = read_or(config, s, "stop_limit_percent", p.stop_limit_percent)?;

    p.sma.enabled = read_flag(config, s, "sma_enable", p.sma.enabled)?;
    p.sma.period1 = read_period(config, s, "sma_period1", p.sma.period1)?;
    p.sma.period2 = read_period(config, s, "sma_period2", p.sma.period2)?;
    p.sma.period3 = read_period(config, s, "sma_period3", p.sma.period3)?;

    p.ema.enabled = read_flag(config, s, "ema_enable", p.ema.enabled)?;
    p.ema.period1 = read_period(config, s, "ema_period1", p.ema.period1)?;
    p.ema.period2 = read_period(config, s, "ema_period2", p.ema.period2)?;
    p.ema.period3 = read_period(config, s, "ema_period3", p.ema.period3)?;

    p.bbands.enabled = read_flag(config, s, "bbands_enable", p.bbands.enabled)?;
    p.bbands.n = read_period(config, s, "bbands_n", p.bbands.n)?;
    p.bbands.k = read_or(config, s, "bbands_k", p.bbands.k)?;

    p.ichimoku.enabled = read_flag(config, s, "ichimoku_enable", p.ichimoku.enabled)?;

    p.rsi.enabled = read_flag(config, s, "rsi_enable", p.rsi.enabled)?;
    p.rsi.period = read_period(config, s, "rsi_period", p.rsi.period)?;
    p.rsi.buy_threshold = read_or(config, s, "rsi_buy_threshold", p.rsi.buy_threshold)?;
    p.rsi.sell_threshold = read_or(config, s, "rsi_sell_threshold", p.rsi.sell_threshold)?;

    p.macd.enabled = read_flag(config, s, "macd_enable", p.macd.enabled)?;
    p.macd.fast_period = read_period(config, s, "macd_fast_period", p.macd.fast_period)?;
    p.macd.slow_period = read_period(config, s, "macd_slow_period", p.macd.slow_period)?;
    p.macd.signal_period = read_period(config, s, "macd_signal_period", p.macd.signal_period)?;

    p.validate().map_err(|e| match e {
        TradebotError::InvalidParams { field, reason } => TradebotError::ConfigInvalid {
            section: s.to_string(),
            key: field,
            reason,
        },
        other => other,
    })?;
    Ok(p)
}

pub fn load_optimizer_settings(config: &dyn ConfigPort) -> Result<OptimizerSettings, TradebotError> {
    let s = OPTIMIZER_SECTION;
    let mut settings = OptimizerSettings::default();

    if let Some(preset) = config.get_string(s, "preset") {
        settings.space = match preset.trim().to_lowercase().as_str() {
            "wide" => SearchSpace::wide(),
            "narrow" => SearchSpace::narrow(),
            other => {
                return Err(TradebotError::ConfigInvalid {
                    section: s.to_string(),
                    key: "preset".to_string(),
                    reason: format!("expected wide or narrow, got {other:?}"),
                });
            }
        };
    }

    if let Some(raw) = config.get_string(s, "timeout_secs") {
        let secs: u64 = parse_value(s, "timeout_secs", &raw)?;
        if secs == 0 {
            return Err(TradebotError::ConfigInvalid {
                section: s.to_string(),
                key: "timeout_secs".to_string(),
                reason: "timeout_secs must be positive".to_string(),
            });
        }
        settings.timeout = Some(Duration::from_secs(secs));
    }

    settings.parallel = read_flag(config, s, "parallel", settings.parallel)?;
    Ok(settings)
}

/// `[calendar]`; defaults to JST with a 09:00 trade hour.
pub fn load_calendar(config: &dyn ConfigPort) -> Result<TradeCalendar, TradebotError> {
    let s = CALENDAR_SECTION;
    let default = TradeCalendar::default();
    let default_hours = default.offset().local_minus_utc() / 3600;

    let hours: i32 = read_or(config, s, "utc_offset_hours", default_hours)?;
    let trade_hour: u32 = read_or(config, s, "trade_hour", default.trade_hour())?;
    TradeCalendar::from_offset_hours(hours, trade_hour)
}

fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TradebotError> {
    match config.get_string(section, key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(TradebotError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn parse_value<T>(section: &str, key: &str, raw: &str) -> Result<T, TradebotError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| TradebotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("cannot parse {raw:?}: {e}"),
    })
}

fn read_or<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, TradebotError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        Some(raw) => parse_value(section, key, &raw),
        None => Ok(default),
    }
}

/// Like [`ConfigPort::get_bool`], but a present value that is not a boolean
/// is an error rather than the default.
fn read_flag(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, TradebotError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| TradebotError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

fn read_period(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, TradebotError> {
    let value: i64 = read_or(config, section, key, default as i64)?;
    usize::try_from(value).map_err(|_| TradebotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{key} must be non-negative, got {value}"),
    })
}

fn invalid(section: &str, key: &str, err: TradebotError) -> TradebotError {
    TradebotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: err.to_string(),
    }
}
