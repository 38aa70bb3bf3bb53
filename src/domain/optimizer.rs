//! Brute-force parameter optimizer.
//!
//! Each indicator family is searched independently over a [`SearchSpace`]
//! grid. Every grid point is a single-family backtest over the same
//! read-only series, so points are evaluated in parallel with rayon and
//! reduced deterministically: highest profit wins, ties go to the point
//! that comes first in grid order.
//!
//! A point is only adopted when it strictly beats the baseline, which is
//! the larger of zero ("no trades") and the profit of the incoming
//! parameters.

use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::domain::backtest::{
    backtest_bbands, backtest_ema, backtest_ichimoku, backtest_macd, backtest_rsi,
};
use crate::domain::error::TradebotError;
use crate::domain::params::{BBandsParams, EmaParams, MacdParams, RsiParams, TradeParams};
use crate::domain::series::CandleSeries;
use crate::domain::signal::SignalLedger;

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub start: usize,
    pub end: usize,
}

impl IntRange {
    pub const fn new(start: usize, end: usize) -> Self {
        IntRange { start, end }
    }

    pub fn values(self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `count` values `start + i * step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatGrid {
    pub start: f64,
    pub step: f64,
    pub count: usize,
}

impl FloatGrid {
    pub const fn new(start: f64, step: f64, count: usize) -> Self {
        FloatGrid { start, step, count }
    }

    pub const fn single(value: f64) -> Self {
        FloatGrid {
            start: value,
            step: 0.0,
            count: 1,
        }
    }

    pub fn values(self) -> impl Iterator<Item = f64> {
        (0..self.count).map(move |i| self.start + i as f64 * self.step)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmaSpace {
    pub fast: IntRange,
    pub slow: IntRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BBandsSpace {
    pub n: IntRange,
    pub k: FloatGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiSpace {
    pub period: IntRange,
    pub buy_threshold: FloatGrid,
    pub sell_threshold: FloatGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSpace {
    pub fast: IntRange,
    pub slow: IntRange,
    pub signal: IntRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub ema: EmaSpace,
    pub bbands: BBandsSpace,
    pub rsi: RsiSpace,
    pub macd: MacdSpace,
}

impl SearchSpace {
    /// Broad ranges used by the trading loop.
    pub fn wide() -> Self {
        SearchSpace {
            ema: EmaSpace {
                fast: IntRange::new(5, 10),
                slow: IntRange::new(12, 19),
            },
            bbands: BBandsSpace {
                n: IntRange::new(10, 30),
                k: FloatGrid::new(1.8, 0.1, 5),
            },
            rsi: RsiSpace {
                period: IntRange::new(3, 29),
                buy_threshold: FloatGrid::new(20.0, 1.0, 21),
                sell_threshold: FloatGrid::new(60.0, 1.0, 21),
            },
            macd: MacdSpace {
                fast: IntRange::new(5, 19),
                slow: IntRange::new(20, 39),
                signal: IntRange::new(5, 14),
            },
        }
    }

    /// Ranges centred on the textbook defaults; much cheaper than `wide`.
    pub fn narrow() -> Self {
        SearchSpace {
            ema: EmaSpace {
                fast: IntRange::new(7, 10),
                slow: IntRange::new(20, 25),
            },
            bbands: BBandsSpace {
                n: IntRange::new(20, 21),
                k: FloatGrid::single(2.0),
            },
            rsi: RsiSpace {
                period: IntRange::new(14, 21),
                buy_threshold: FloatGrid::new(25.0, 1.0, 11),
                sell_threshold: FloatGrid::new(65.0, 1.0, 11),
            },
            macd: SearchSpace::wide().macd,
        }
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace::wide()
    }
}

/// Shared cancellation flag with an optional deadline. Clones observe the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn check(&self) -> Result<(), TradebotError> {
        if self.is_cancelled() {
            Err(TradebotError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaPoint {
    pub fast: usize,
    pub slow: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBandsPoint {
    pub n: usize,
    pub k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiPoint {
    pub period: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdPoint {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// Outcome of one family's search.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized<P> {
    pub performance: f64,
    pub params: P,
    pub changed: bool,
}

/// Per-family results of [`Optimizer::optimize_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeAllReport {
    pub ema: Optimized<EmaPoint>,
    pub bbands: Optimized<BBandsPoint>,
    pub rsi: Optimized<RsiPoint>,
    pub macd: Optimized<MacdPoint>,
}

impl OptimizeAllReport {
    pub fn changed(&self) -> bool {
        self.ema.changed || self.bbands.changed || self.rsi.changed || self.macd.changed
    }
}

#[derive(Debug, Clone)]
pub struct Optimizer {
    space: SearchSpace,
    parallel: bool,
    cancel: CancelToken,
}

impl Optimizer {
    pub fn new(space: SearchSpace) -> Self {
        Optimizer {
            space,
            parallel: true,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Evaluates every point and returns the best `(profit, point)`, or
    /// `None` when nothing was computable. `eval` yields `None` for points
    /// whose indicator cannot be built.
    fn grid_search<P, F>(&self, family: &'static str, points: &[P], eval: F) -> Result<Option<(f64, P)>, TradebotError>
    where
        P: Copy + Send + Sync + std::fmt::Debug,
        F: Fn(&P) -> Option<f64> + Send + Sync,
    {
        let evaluate = |point: &P| -> Result<Option<f64>, TradebotError> {
            self.cancel.check()?;
            let profit = eval(point);
            debug!(family, ?point, ?profit, "grid point evaluated");
            Ok(profit)
        };

        let profits: Vec<Option<f64>> = if self.parallel {
            points
                .par_iter()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            points
                .iter()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut best: Option<(f64, P)> = None;
        for (point, profit) in points.iter().zip(profits) {
            let Some(profit) = profit else { continue };
            if best.is_none_or(|(top, _)| profit > top) {
                best = Some((profit, *point));
            }
        }
        Ok(best)
    }

    fn adopt<P: Copy>(family: &'static str, incoming: P, baseline: f64, best: Option<(f64, P)>) -> Optimized<P> {
        let result = match best {
            Some((profit, point)) if profit > baseline => Optimized {
                performance: profit,
                params: point,
                changed: true,
            },
            _ => Optimized {
                performance: baseline,
                params: incoming,
                changed: false,
            },
        };
        info!(
            family,
            performance = result.performance,
            changed = result.changed,
            "optimization finished"
        );
        result
    }

    pub fn optimize_ema(
        &self,
        series: &CandleSeries,
        incoming: EmaPoint,
        size: f64,
    ) -> Result<Optimized<EmaPoint>, TradebotError> {
        let baseline = baseline(backtest_ema(series, incoming.fast, incoming.slow, size).ok());
        let points: Vec<EmaPoint> = self
            .space
            .ema
            .fast
            .values()
            .flat_map(|fast| self.space.ema.slow.values().map(move |slow| EmaPoint { fast, slow }))
            .collect();
        let best = self.grid_search("ema", &points, |p| {
            backtest_ema(series, p.fast, p.slow, size)
                .ok()
                .map(|l| l.estimate_profit())
        })?;
        Ok(Self::adopt("ema", incoming, baseline, best))
    }

    pub fn optimize_bbands(
        &self,
        series: &CandleSeries,
        incoming: BBandsPoint,
        size: f64,
    ) -> Result<Optimized<BBandsPoint>, TradebotError> {
        let baseline = baseline(backtest_bbands(series, incoming.n, incoming.k, size).ok());
        let points: Vec<BBandsPoint> = self
            .space
            .bbands
            .n
            .values()
            .flat_map(|n| self.space.bbands.k.values().map(move |k| BBandsPoint { n, k }))
            .collect();
        let best = self.grid_search("bbands", &points, |p| {
            backtest_bbands(series, p.n, p.k, size)
                .ok()
                .map(|l| l.estimate_profit())
        })?;
        Ok(Self::adopt("bbands", incoming, baseline, best))
    }

    /// Ichimoku has no tunable parameters; only its performance is reported.
    pub fn optimize_ichimoku(&self, series: &CandleSeries, size: f64) -> Result<Optimized<()>, TradebotError> {
        self.cancel.check()?;
        let performance = backtest_ichimoku(series, size)
            .map(|l| l.estimate_profit())
            .unwrap_or(0.0);
        info!(family = "ichimoku", performance, "optimization finished");
        Ok(Optimized {
            performance,
            params: (),
            changed: false,
        })
    }

    pub fn optimize_rsi(
        &self,
        series: &CandleSeries,
        incoming: RsiPoint,
        size: f64,
    ) -> Result<Optimized<RsiPoint>, TradebotError> {
        let baseline = baseline(
            backtest_rsi(
                series,
                incoming.period,
                incoming.buy_threshold,
                incoming.sell_threshold,
                size,
            )
            .ok(),
        );
        let space = &self.space.rsi;
        let points: Vec<RsiPoint> = space
            .period
            .values()
            .flat_map(|period| {
                space.buy_threshold.values().flat_map(move |buy_threshold| {
                    space.sell_threshold.values().map(move |sell_threshold| RsiPoint {
                        period,
                        buy_threshold,
                        sell_threshold,
                    })
                })
            })
            .collect();
        let best = self.grid_search("rsi", &points, |p| {
            backtest_rsi(series, p.period, p.buy_threshold, p.sell_threshold, size)
                .ok()
                .map(|l| l.estimate_profit())
        })?;
        Ok(Self::adopt("rsi", incoming, baseline, best))
    }

    pub fn optimize_macd(
        &self,
        series: &CandleSeries,
        incoming: MacdPoint,
        size: f64,
    ) -> Result<Optimized<MacdPoint>, TradebotError> {
        let baseline = baseline(
            backtest_macd(series, incoming.fast, incoming.slow, incoming.signal, size).ok(),
        );
        let space = &self.space.macd;
        let points: Vec<MacdPoint> = space
            .fast
            .values()
            .flat_map(|fast| {
                space.slow.values().flat_map(move |slow| {
                    space
                        .signal
                        .values()
                        .map(move |signal| MacdPoint { fast, slow, signal })
                })
            })
            .collect();
        let best = self.grid_search("macd", &points, |p| {
            backtest_macd(series, p.fast, p.slow, p.signal, size)
                .ok()
                .map(|l| l.estimate_profit())
        })?;
        Ok(Self::adopt("macd", incoming, baseline, best))
    }

    /// Optimizes EMA, BBands, RSI and MACD one family at a time and
    /// assembles the winners into new parameters. Families are searched
    /// whether or not they are enabled; interactions between families are
    /// not explored.
    pub fn optimize_all(
        &self,
        series: &CandleSeries,
        params: &TradeParams,
    ) -> Result<(TradeParams, OptimizeAllReport), TradebotError> {
        let size = params.size;
        let report = OptimizeAllReport {
            ema: self.optimize_ema(series, EmaPoint::from(&params.ema), size)?,
            bbands: self.optimize_bbands(series, BBandsPoint::from(&params.bbands), size)?,
            rsi: self.optimize_rsi(series, RsiPoint::from(&params.rsi), size)?,
            macd: self.optimize_macd(series, MacdPoint::from(&params.macd), size)?,
        };

        let mut updated = params.clone();
        updated.ema.period1 = report.ema.params.fast;
        updated.ema.period2 = report.ema.params.slow;
        updated.bbands.n = report.bbands.params.n;
        updated.bbands.k = report.bbands.params.k;
        updated.rsi.period = report.rsi.params.period;
        updated.rsi.buy_threshold = report.rsi.params.buy_threshold;
        updated.rsi.sell_threshold = report.rsi.params.sell_threshold;
        updated.macd.fast_period = report.macd.params.fast;
        updated.macd.slow_period = report.macd.params.slow;
        updated.macd.signal_period = report.macd.params.signal;
        updated.validate()?;

        info!(
            product = %params.product_code,
            changed = report.changed(),
            "parameters optimized"
        );
        Ok((updated, report))
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::new(SearchSpace::default())
    }
}

fn baseline(incoming: Option<SignalLedger>) -> f64 {
    incoming.map_or(0.0, |l| l.estimate_profit()).max(0.0)
}

impl From<&EmaParams> for EmaPoint {
    fn from(p: &EmaParams) -> Self {
        EmaPoint {
            fast: p.period1,
            slow: p.period2,
        }
    }
}

impl From<&BBandsParams> for BBandsPoint {
    fn from(p: &BBandsParams) -> Self {
        BBandsPoint { n: p.n, k: p.k }
    }
}

impl From<&RsiParams> for RsiPoint {
    fn from(p: &RsiParams) -> Self {
        RsiPoint {
            period: p.period,
            buy_threshold: p.buy_threshold,
            sell_threshold: p.sell_threshold,
        }
    }
}

impl From<&MacdParams> for MacdPoint {
    fn from(p: &MacdParams) -> Self {
        MacdPoint {
            fast: p.fast_period,
            slow: p.slow_period,
            signal: p.signal_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn series_of(closes: &[f64]) -> CandleSeries {
        let t0 = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    "BTC_JPY",
                    TimeDelta::days(1),
                    t0 + TimeDelta::days(i as i64),
                    c,
                    c,
                    c + 1.0,
                    c - 1.0,
                    5.0,
                )
                .unwrap()
            })
            .collect();
        CandleSeries::new("BTC_JPY", candles).unwrap()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 1000.0 + (i as f64 * 0.25).sin() * 100.0 + i as f64)
            .collect()
    }

    fn small_space() -> SearchSpace {
        SearchSpace {
            ema: EmaSpace {
                fast: IntRange::new(2, 4),
                slow: IntRange::new(6, 8),
            },
            bbands: BBandsSpace {
                n: IntRange::new(5, 7),
                k: FloatGrid::new(1.5, 0.5, 2),
            },
            rsi: RsiSpace {
                period: IntRange::new(3, 5),
                buy_threshold: FloatGrid::new(25.0, 5.0, 2),
                sell_threshold: FloatGrid::new(70.0, 5.0, 2),
            },
            macd: MacdSpace {
                fast: IntRange::new(3, 4),
                slow: IntRange::new(8, 9),
                signal: IntRange::new(3, 4),
            },
        }
    }

    #[test]
    fn wide_space_sizes() {
        let s = SearchSpace::wide();
        assert_eq!(s.ema.fast.len() * s.ema.slow.len(), 6 * 8);
        assert_eq!(s.bbands.n.len(), 21);
        let ks: Vec<f64> = s.bbands.k.values().collect();
        assert_eq!(ks.len(), 5);
        assert_relative_eq!(ks[4], 2.2, epsilon = 1e-12);
        assert_eq!(s.rsi.period.len(), 27);
        assert_eq!(s.rsi.buy_threshold.values().last(), Some(40.0));
        assert_eq!(s.rsi.sell_threshold.values().last(), Some(80.0));
        assert_eq!(s.macd.fast.len() * s.macd.slow.len() * s.macd.signal.len(), 15 * 20 * 10);
    }

    #[test]
    fn narrow_space_values() {
        let s = SearchSpace::narrow();
        assert_eq!(s.ema.fast, IntRange::new(7, 10));
        assert_eq!(s.ema.slow, IntRange::new(20, 25));
        assert_eq!(s.bbands.k.values().collect::<Vec<_>>(), vec![2.0]);
        assert_eq!(s.rsi.buy_threshold.values().next(), Some(25.0));
        assert_eq!(s.rsi.sell_threshold.values().last(), Some(75.0));
        assert_eq!(s.macd, SearchSpace::wide().macd);
        assert_eq!(SearchSpace::default(), SearchSpace::wide());
    }

    #[test]
    fn empty_int_range() {
        let r = IntRange::new(5, 4);
        assert!(r.is_empty());
        assert_eq!(r.values().count(), 0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let s = series_of(&wave(120));
        let incoming = EmaPoint { fast: 3, slow: 7 };
        let par = Optimizer::new(small_space()).optimize_ema(&s, incoming, 1.0).unwrap();
        let seq = Optimizer::new(small_space())
            .with_parallelism(false)
            .optimize_ema(&s, incoming, 1.0)
            .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn never_worse_than_incoming() {
        let s = series_of(&wave(120));
        let opt = Optimizer::new(small_space());

        let incoming = EmaPoint { fast: 3, slow: 7 };
        let own = backtest_ema(&s, 3, 7, 1.0).unwrap().estimate_profit();
        let result = opt.optimize_ema(&s, incoming, 1.0).unwrap();
        assert!(result.performance >= own);
        assert!(result.performance >= 0.0);

        let incoming = RsiPoint {
            period: 14,
            buy_threshold: 30.0,
            sell_threshold: 70.0,
        };
        let own = backtest_rsi(&s, 14, 30.0, 70.0, 1.0).unwrap().estimate_profit();
        assert!(opt.optimize_rsi(&s, incoming, 1.0).unwrap().performance >= own);
    }

    #[test]
    fn unchanged_keeps_incoming_params() {
        // Monotonic decline: nothing ever closes at a profit.
        let closes: Vec<f64> = (0..80).map(|i| 2000.0 - i as f64 * 10.0).collect();
        let s = series_of(&closes);
        let incoming = EmaPoint { fast: 9, slow: 30 };
        let result = Optimizer::new(small_space()).optimize_ema(&s, incoming, 1.0).unwrap();
        assert!(!result.changed);
        assert_eq!(result.params, incoming);
        assert_eq!(result.performance, 0.0);
    }

    #[test]
    fn cancelled_search_errors() {
        let s = series_of(&wave(120));
        let token = CancelToken::new();
        token.cancel();
        let opt = Optimizer::new(small_space()).with_cancel_token(token.clone());
        assert!(token.is_cancelled());
        let err = opt.optimize_ema(&s, EmaPoint { fast: 3, slow: 7 }, 1.0).unwrap_err();
        assert!(matches!(err, TradebotError::Cancelled));
        assert!(matches!(
            opt.optimize_ichimoku(&s, 1.0),
            Err(TradebotError::Cancelled)
        ));
    }

    #[test]
    fn expired_deadline_cancels() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn ichimoku_reports_performance_only() {
        let s = series_of(&wave(120));
        let result = Optimizer::default().optimize_ichimoku(&s, 1.0).unwrap();
        assert!(!result.changed);
        let short = series_of(&wave(20));
        assert_eq!(Optimizer::default().optimize_ichimoku(&short, 1.0).unwrap().performance, 0.0);
    }

    #[test]
    fn optimize_all_assembles_family_winners() {
        let s = series_of(&wave(150));
        let params = TradeParams::basic("BTC_JPY", 1.0).unwrap();
        let opt = Optimizer::new(small_space()).with_parallelism(false);
        let (updated, report) = opt.optimize_all(&s, &params).unwrap();

        assert_eq!(updated.ema.period1, report.ema.params.fast);
        assert_eq!(updated.ema.period2, report.ema.params.slow);
        assert_eq!(updated.ema.period3, params.ema.period3);
        assert_eq!(updated.bbands.n, report.bbands.params.n);
        assert_eq!(updated.rsi.period, report.rsi.params.period);
        assert_eq!(updated.macd.signal_period, report.macd.params.signal);
        assert_eq!(updated.sma, params.sma);
        assert_eq!(updated.stop_limit_percent, params.stop_limit_percent);
        assert_eq!(report.changed(), updated != params);
    }

    #[test]
    fn ties_keep_first_point_in_grid_order() {
        // Flat prices never signal: every point scores 0, nothing beats the
        // baseline.
        let s = series_of(&[500.0; 60]);
        let opt = Optimizer::new(small_space());
        let points = [EmaPoint { fast: 2, slow: 6 }, EmaPoint { fast: 3, slow: 6 }];
        let best = opt.grid_search("ema", &points, |_| Some(1.0)).unwrap();
        assert_eq!(best, Some((1.0, points[0])));
        let best = opt.grid_search("ema", &points, |_| None).unwrap();
        assert_eq!(best, None);
        let result = opt.optimize_ema(&s, EmaPoint { fast: 3, slow: 7 }, 1.0).unwrap();
        assert!(!result.changed);
    }
}
