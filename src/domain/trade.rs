//! Live trade decision for the latest bar, and the bookkeeping around an
//! exchange fill. Order placement and balance lookups stay with the caller.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::backtest::{Votes, analyze};
use crate::domain::error::TradebotError;
use crate::domain::params::TradeParams;
use crate::domain::series::CandleSeries;
use crate::domain::signal::{Side, SignalEvent, SignalLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeDecision {
    pub action: TradeAction,
    pub votes: Votes,
    /// Set after a sell: the position is closed and parameters should be
    /// re-optimized before the next entry.
    pub reoptimize: bool,
}

/// Decides what to do at `now` given the latest bar of `series` (indicators
/// attached) and the live ledger.
pub fn decide_trade(
    series: &CandleSeries,
    live: &SignalLedger,
    params: &TradeParams,
    now: DateTime<Utc>,
) -> Result<TradeDecision, TradebotError> {
    if !params.trade_enable {
        return Err(TradebotError::TradeDisabled {
            product_code: params.product_code.clone(),
        });
    }
    let Some(last) = series.last() else {
        return Err(TradebotError::NoData {
            product_code: series.product_code().to_string(),
        });
    };

    let votes = analyze(series, series.len() - 1, params);
    let cut_loss = live.should_cut_loss(last.close, params.stop_limit_percent);

    let action = if votes.buy > 0 && live.can_buy_at(now) {
        TradeAction::Buy
    } else if (votes.sell > 0 || cut_loss) && live.can_sell_at(now) {
        TradeAction::Sell
    } else {
        TradeAction::Hold
    };

    if action != TradeAction::Hold {
        info!(
            product = %params.product_code,
            ?action,
            buy_votes = votes.buy,
            sell_votes = votes.sell,
            cut_loss,
            "trade decision"
        );
    }

    Ok(TradeDecision {
        action,
        votes,
        reoptimize: action == TradeAction::Sell,
    })
}

/// Records an exchange fill as the definitive signal event.
pub fn record_fill(
    ledger: &mut SignalLedger,
    product_code: &str,
    side: Side,
    time: DateTime<Utc>,
    price: f64,
    size: f64,
) -> Result<SignalEvent, TradebotError> {
    let event = SignalEvent::new(time, product_code, side, price, size)?;
    ledger.add_signal(event.clone())?;
    Ok(event)
}

/// Whether `available_quote` covers buying `size` at the best ask.
pub fn can_afford(available_quote: f64, best_ask: f64, size: f64) -> bool {
    available_quote >= best_ask * size
}

/// Sell quantity clamped to what is actually held.
pub fn sell_size(available_base: f64, size: f64) -> f64 {
    size.min(available_base)
}

/// Splits `BTC_JPY` into `("BTC", "JPY")`: the coin and the currency it is
/// quoted in.
pub fn split_product_code(product_code: &str) -> Result<(&str, &str), TradebotError> {
    match product_code.split_once('_') {
        Some((coin, currency)) if !coin.is_empty() && !currency.is_empty() => Ok((coin, currency)),
        _ => Err(TradebotError::InvalidParams {
            field: "product_code".into(),
            reason: format!("expected COIN_CURRENCY, got {product_code:?}"),
        }),
    }
}
