//! Backtest engine: per-bar voting across indicator families and the
//! single-family walks used by the optimizer.
//!
//! Every walk goes bar by bar from index 0. A bar with buy votes tries to
//! append a buy at its close, then a bar with sell votes (or, in the
//! multi-family walk, a tripped cut-loss) tries to append a sell. Attempts
//! the ledger refuses are dropped.

use tracing::{debug, info};

use crate::domain::candle::Candle;
use crate::domain::indicator::{BBands, Ema, Ichimoku, IndicatorError, Macd, Rsi};
use crate::domain::params::TradeParams;
use crate::domain::series::CandleSeries;
use crate::domain::signal::{Side, SignalEvent, SignalLedger};
use crate::domain::signal_rules::{
    bbands_buy_signal, bbands_sell_signal, ema_buy_signal, ema_sell_signal, ichimoku_buy_signal,
    ichimoku_sell_signal, macd_buy_signal, macd_sell_signal, rsi_buy_signal, rsi_sell_signal,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Votes {
    pub buy: usize,
    pub sell: usize,
}

impl Votes {
    fn from_signals(buy: bool, sell: bool) -> Self {
        Votes {
            buy: usize::from(buy),
            sell: usize::from(sell),
        }
    }

    fn add(&mut self, buy: bool, sell: bool) {
        self.buy += usize::from(buy);
        self.sell += usize::from(sell);
    }
}

/// Counts buy and sell votes at bar `at` from every enabled family whose
/// indicator is attached to the series. SMA does not vote.
pub fn analyze(series: &CandleSeries, at: usize, params: &TradeParams) -> Votes {
    let mut votes = Votes::default();
    if at == 0 {
        return votes;
    }
    let candles = series.candles();

    if params.ema.enabled && series.emas.len() >= 2 {
        let (fast, slow) = (&series.emas[0], &series.emas[1]);
        votes.add(
            ema_buy_signal(fast, slow, at),
            ema_sell_signal(fast, slow, at),
        );
    }

    if params.bbands.enabled {
        if let Some(bb) = &series.bbands {
            votes.add(
                bbands_buy_signal(bb, candles, at),
                bbands_sell_signal(bb, candles, at),
            );
        }
    }

    if params.ichimoku.enabled {
        if let Some(ichimoku) = &series.ichimoku {
            votes.add(
                ichimoku_buy_signal(ichimoku, candles, at),
                ichimoku_sell_signal(ichimoku, candles, at),
            );
        }
    }

    if params.rsi.enabled {
        if let Some(rsi) = &series.rsi {
            votes.add(
                rsi_buy_signal(rsi, params.rsi.buy_threshold, at),
                rsi_sell_signal(rsi, params.rsi.sell_threshold, at),
            );
        }
    }

    if params.macd.enabled {
        if let Some(macd) = &series.macd {
            votes.add(macd_buy_signal(macd, at), macd_sell_signal(macd, at));
        }
    }

    votes
}

fn try_signal(ledger: &mut SignalLedger, candle: &Candle, side: Side, size: f64) {
    let allowed = match side {
        Side::Buy => ledger.can_buy_at(candle.time),
        Side::Sell => ledger.can_sell_at(candle.time),
    };
    if !allowed {
        return;
    }
    let event = match SignalEvent::new(candle.time, &candle.product_code, side, candle.close, size) {
        Ok(event) => event,
        Err(e) => {
            debug!(time = %candle.time, %side, error = %e, "signal skipped");
            return;
        }
    };
    match ledger.add_signal(event) {
        Ok(()) => debug!(time = %candle.time, %side, price = candle.close, "signal recorded"),
        Err(e) => debug!(time = %candle.time, error = %e, "signal rejected"),
    }
}

/// Shared bar walk. `stop_limit_percent` enables the cut-loss sell.
fn walk<F>(series: &CandleSeries, size: f64, stop_limit_percent: Option<f64>, votes_at: F) -> SignalLedger
where
    F: Fn(usize) -> Votes,
{
    let mut ledger = SignalLedger::new();

    for (at, candle) in series.candles().iter().enumerate() {
        let votes = votes_at(at);

        if votes.buy > 0 {
            try_signal(&mut ledger, candle, Side::Buy, size);
        }

        let cut_loss = stop_limit_percent
            .is_some_and(|pct| ledger.should_cut_loss(candle.close, pct));
        if votes.sell > 0 || cut_loss {
            try_signal(&mut ledger, candle, Side::Sell, size);
        }
    }

    ledger
}

/// Runs the multi-family backtest over the indicators already attached to
/// `series`, stores the resulting ledger on the series and returns its
/// profit.
pub fn backtest(series: &mut CandleSeries, params: &TradeParams) -> f64 {
    let view: &CandleSeries = series;
    let ledger = walk(view, params.size, Some(params.stop_limit_percent), |at| {
        analyze(view, at, params)
    });
    let profit = ledger.estimate_profit();
    info!(
        product = %series.product_code(),
        bars = series.len(),
        events = ledger.len(),
        profit,
        "backtest finished"
    );
    series.set_backtest_events(ledger);
    profit
}

pub fn backtest_ema(
    series: &CandleSeries,
    fast_period: usize,
    slow_period: usize,
    size: f64,
) -> Result<SignalLedger, IndicatorError> {
    let closes = series.closes();
    let fast = Ema::new(&closes, fast_period)?;
    let slow = Ema::new(&closes, slow_period)?;
    Ok(walk(series, size, None, |at| {
        Votes::from_signals(
            ema_buy_signal(&fast, &slow, at),
            ema_sell_signal(&fast, &slow, at),
        )
    }))
}

pub fn backtest_bbands(
    series: &CandleSeries,
    n: usize,
    k: f64,
    size: f64,
) -> Result<SignalLedger, IndicatorError> {
    let bb = BBands::new(&series.closes(), n, k)?;
    let candles = series.candles();
    Ok(walk(series, size, None, |at| {
        Votes::from_signals(
            bbands_buy_signal(&bb, candles, at),
            bbands_sell_signal(&bb, candles, at),
        )
    }))
}

pub fn backtest_ichimoku(series: &CandleSeries, size: f64) -> Result<SignalLedger, IndicatorError> {
    let ichimoku = Ichimoku::new(&series.closes())?;
    let candles = series.candles();
    Ok(walk(series, size, None, |at| {
        Votes::from_signals(
            ichimoku_buy_signal(&ichimoku, candles, at),
            ichimoku_sell_signal(&ichimoku, candles, at),
        )
    }))
}

pub fn backtest_rsi(
    series: &CandleSeries,
    period: usize,
    buy_threshold: f64,
    sell_threshold: f64,
    size: f64,
) -> Result<SignalLedger, IndicatorError> {
    let rsi = Rsi::new(&series.closes(), period)?;
    Ok(walk(series, size, None, |at| {
        Votes::from_signals(
            rsi_buy_signal(&rsi, buy_threshold, at),
            rsi_sell_signal(&rsi, sell_threshold, at),
        )
    }))
}

pub fn backtest_macd(
    series: &CandleSeries,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    size: f64,
) -> Result<SignalLedger, IndicatorError> {
    let macd = Macd::new(&series.closes(), fast_period, slow_period, signal_period)?;
    Ok(walk(series, size, None, |at| {
        Votes::from_signals(macd_buy_signal(&macd, at), macd_sell_signal(&macd, at))
    }))
}
