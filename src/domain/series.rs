//! Candle series for one product, with attached indicators and signal
//! ledgers.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::candle::Candle;
use crate::domain::error::TradebotError;
use crate::domain::indicator::{
    BBands, Ema, Ichimoku, IndicatorError, IndicatorKind, Macd, Rsi, Sma, value_at,
};
use crate::domain::params::TradeParams;
use crate::domain::signal::SignalLedger;

const BOXED_RSI_LOW: f64 = 40.0;
const BOXED_RSI_HIGH: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    product_code: String,
    candles: Vec<Candle>,
    pub smas: Vec<Sma>,
    pub emas: Vec<Ema>,
    pub bbands: Option<BBands>,
    pub ichimoku: Option<Ichimoku>,
    pub rsi: Option<Rsi>,
    pub macd: Option<Macd>,
    live_events: Option<SignalLedger>,
    backtest_events: Option<SignalLedger>,
}

impl CandleSeries {
    /// Candles must belong to `product_code` and be strictly ascending by
    /// time.
    pub fn new(product_code: &str, candles: Vec<Candle>) -> Result<Self, TradebotError> {
        if product_code.is_empty() {
            return Err(TradebotError::InvalidCandle {
                reason: "series product code is empty".into(),
            });
        }
        if let Some(c) = candles.iter().find(|c| c.product_code != product_code) {
            return Err(TradebotError::InvalidCandle {
                reason: format!("{} candle in {} series", c.product_code, product_code),
            });
        }
        if let Some(pair) = candles.windows(2).find(|w| w[0].time >= w[1].time) {
            return Err(TradebotError::InvalidCandle {
                reason: format!(
                    "candles out of order: {} is not before {}",
                    pair[0].time, pair[1].time
                ),
            });
        }

        Ok(CandleSeries {
            product_code: product_code.to_string(),
            candles,
            smas: Vec::new(),
            emas: Vec::new(),
            bbands: None,
            ichimoku: None,
            rsi: None,
            macd: None,
            live_events: None,
            backtest_events: None,
        })
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.candles.iter().map(|c| c.time).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn add_sma(&mut self, period: usize) -> Result<(), IndicatorError> {
        self.smas.push(Sma::new(&self.closes(), period)?);
        Ok(())
    }

    pub fn add_ema(&mut self, period: usize) -> Result<(), IndicatorError> {
        self.emas.push(Ema::new(&self.closes(), period)?);
        Ok(())
    }

    pub fn add_bbands(&mut self, n: usize, k: f64) -> Result<(), IndicatorError> {
        self.bbands = Some(BBands::new(&self.closes(), n, k)?);
        Ok(())
    }

    pub fn add_ichimoku(&mut self) -> Result<(), IndicatorError> {
        self.ichimoku = Some(Ichimoku::new(&self.closes())?);
        Ok(())
    }

    pub fn add_rsi(&mut self, period: usize) -> Result<(), IndicatorError> {
        self.rsi = Some(Rsi::new(&self.closes(), period)?);
        Ok(())
    }

    pub fn add_macd(&mut self, fast: usize, slow: usize, signal: usize) -> Result<(), IndicatorError> {
        self.macd = Some(Macd::new(&self.closes(), fast, slow, signal)?);
        Ok(())
    }

    /// Computes every enabled family and returns `params` with the families
    /// that could not be computed switched off.
    ///
    /// EMA needs its first two periods (the crossing pair); the third line is
    /// attached when it can be.
    pub fn attach_indicators(&mut self, params: &TradeParams) -> TradeParams {
        let mut effective = params.clone();
        self.clear_indicators();

        if params.sma.enabled {
            let periods = [params.sma.period1, params.sma.period2, params.sma.period3];
            let mut failed = false;
            for period in periods {
                if let Err(e) = self.add_sma(period) {
                    self.report_failure(IndicatorKind::Sma(period), &e);
                    failed = true;
                }
            }
            if failed {
                self.smas.clear();
            }
            effective.sma.enabled = !failed;
        }

        if params.ema.enabled {
            let fast = self.add_ema(params.ema.period1);
            let slow = fast.and_then(|_| self.add_ema(params.ema.period2));
            match slow {
                Ok(()) => {
                    if let Err(e) = self.add_ema(params.ema.period3) {
                        debug!(product = %self.product_code, period = params.ema.period3, error = %e, "third EMA skipped");
                    }
                }
                Err(e) => {
                    self.emas.clear();
                    self.report_failure(
                        IndicatorKind::Ema(params.ema.period1.min(params.ema.period2)),
                        &e,
                    );
                    effective.ema.enabled = false;
                }
            }
        }

        if params.bbands.enabled {
            if let Err(e) = self.add_bbands(params.bbands.n, params.bbands.k) {
                self.report_failure(
                    IndicatorKind::BBands {
                        n: params.bbands.n,
                        k: params.bbands.k,
                    },
                    &e,
                );
                effective.bbands.enabled = false;
            }
        }

        if params.ichimoku.enabled {
            if let Err(e) = self.add_ichimoku() {
                self.report_failure(IndicatorKind::Ichimoku, &e);
                effective.ichimoku.enabled = false;
            }
        }

        if params.rsi.enabled {
            if let Err(e) = self.add_rsi(params.rsi.period) {
                self.report_failure(IndicatorKind::Rsi(params.rsi.period), &e);
                effective.rsi.enabled = false;
            }
        }

        if params.macd.enabled {
            let (fast, slow, signal) = (
                params.macd.fast_period,
                params.macd.slow_period,
                params.macd.signal_period,
            );
            if let Err(e) = self.add_macd(fast, slow, signal) {
                self.report_failure(IndicatorKind::Macd { fast, slow, signal }, &e);
                effective.macd.enabled = false;
            }
        }

        effective
    }

    /// Drops every attached indicator; ledgers are kept.
    pub fn clear_indicators(&mut self) {
        self.smas.clear();
        self.emas.clear();
        self.bbands = None;
        self.ichimoku = None;
        self.rsi = None;
        self.macd = None;
    }

    fn report_failure(&self, kind: IndicatorKind, error: &IndicatorError) {
        warn!(product = %self.product_code, indicator = %kind, %error, "indicator disabled for this run");
    }

    /// True iff the attached RSI stayed strictly inside (40, 60) for the
    /// `period` bars ending at `at`.
    pub fn is_boxed_range(&self, period: usize, at: usize) -> bool {
        let Some(rsi) = &self.rsi else {
            return false;
        };
        if period == 0 || at >= self.candles.len() {
            return false;
        }
        let start = at.saturating_sub(period - 1);
        (start..=at).all(|i| {
            value_at(&rsi.values, i).is_some_and(|v| v > BOXED_RSI_LOW && v < BOXED_RSI_HIGH)
        })
    }

    pub fn with_live_events(mut self, ledger: SignalLedger) -> Self {
        self.live_events = Some(ledger);
        self
    }

    pub fn live_events(&self) -> Option<&SignalLedger> {
        self.live_events.as_ref()
    }

    pub fn set_backtest_events(&mut self, ledger: SignalLedger) {
        self.backtest_events = Some(ledger);
    }

    pub fn backtest_events(&self) -> Option<&SignalLedger> {
        self.backtest_events.as_ref()
    }
}
