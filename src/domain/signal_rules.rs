//! Per-indicator buy/sell predicates.
//!
//! Each predicate compares bar `at - 1` with bar `at`, so it is `false` at
//! index 0 and whenever a value it needs is still warming up (`None`).
//!
//! - EMA: golden cross buys, dead cross sells
//! - BBands: close crossing up through the lower band buys, crossing down
//!   through the upper band sells
//! - Ichimoku: chikou crossing the bar's high (low), price clear of the
//!   cloud and tenkan above (below) kijun
//! - RSI: crossing up through the buy threshold, down through the sell one
//! - MACD: signal-line cross gated on both lines being below (above) zero

use crate::domain::candle::Candle;
use crate::domain::indicator::{BBands, Ema, Ichimoku, Macd, Rsi, value_at};

/// `(values[at-1], values[at])`, if both are present.
fn step(values: &[Option<f64>], at: usize) -> Option<(f64, f64)> {
    if at < 1 {
        return None;
    }
    Some((value_at(values, at - 1)?, value_at(values, at)?))
}

fn candle_step(candles: &[Candle], at: usize) -> Option<(&Candle, &Candle)> {
    if at < 1 {
        return None;
    }
    Some((candles.get(at - 1)?, candles.get(at)?))
}

pub fn ema_buy_signal(fast: &Ema, slow: &Ema, at: usize) -> bool {
    match (step(&fast.values, at), step(&slow.values, at)) {
        (Some((f0, f1)), Some((s0, s1))) => f0 < s0 && f1 >= s1,
        _ => false,
    }
}

pub fn ema_sell_signal(fast: &Ema, slow: &Ema, at: usize) -> bool {
    match (step(&fast.values, at), step(&slow.values, at)) {
        (Some((f0, f1)), Some((s0, s1))) => f0 > s0 && f1 <= s1,
        _ => false,
    }
}

pub fn bbands_buy_signal(bbands: &BBands, candles: &[Candle], at: usize) -> bool {
    match (step(&bbands.down, at), candle_step(candles, at)) {
        (Some((d0, d1)), Some((c0, c1))) => d0 > c0.close && d1 <= c1.close,
        _ => false,
    }
}

pub fn bbands_sell_signal(bbands: &BBands, candles: &[Candle], at: usize) -> bool {
    match (step(&bbands.up, at), candle_step(candles, at)) {
        (Some((u0, u1)), Some((c0, c1))) => u0 < c0.close && u1 >= c1.close,
        _ => false,
    }
}

struct CloudAt {
    chikou_prev: f64,
    chikou: f64,
    senkou_a: f64,
    senkou_b: f64,
    tenkan: f64,
    kijun: f64,
}

fn cloud_at(ichimoku: &Ichimoku, at: usize) -> Option<CloudAt> {
    let (chikou_prev, chikou) = step(&ichimoku.chikou, at)?;
    Some(CloudAt {
        chikou_prev,
        chikou,
        senkou_a: value_at(&ichimoku.senkou_a, at)?,
        senkou_b: value_at(&ichimoku.senkou_b, at)?,
        tenkan: value_at(&ichimoku.tenkan, at)?,
        kijun: value_at(&ichimoku.kijun, at)?,
    })
}

pub fn ichimoku_buy_signal(ichimoku: &Ichimoku, candles: &[Candle], at: usize) -> bool {
    let (Some(cloud), Some((prev, cur))) = (cloud_at(ichimoku, at), candle_step(candles, at))
    else {
        return false;
    };
    cloud.chikou_prev < prev.high
        && cloud.chikou >= cur.high
        && cloud.senkou_a < cur.low
        && cloud.senkou_b < cur.low
        && cloud.tenkan > cloud.kijun
}

pub fn ichimoku_sell_signal(ichimoku: &Ichimoku, candles: &[Candle], at: usize) -> bool {
    let (Some(cloud), Some((prev, cur))) = (cloud_at(ichimoku, at), candle_step(candles, at))
    else {
        return false;
    };
    cloud.chikou_prev > prev.low
        && cloud.chikou <= cur.low
        && cloud.senkou_a > cur.high
        && cloud.senkou_b > cur.high
        && cloud.tenkan < cloud.kijun
}

pub fn rsi_buy_signal(rsi: &Rsi, buy_threshold: f64, at: usize) -> bool {
    match step(&rsi.values, at) {
        Some((r0, r1)) => r0 < buy_threshold && r1 >= buy_threshold,
        None => false,
    }
}

pub fn rsi_sell_signal(rsi: &Rsi, sell_threshold: f64, at: usize) -> bool {
    match step(&rsi.values, at) {
        Some((r0, r1)) => r0 > sell_threshold && r1 <= sell_threshold,
        None => false,
    }
}

pub fn macd_buy_signal(macd: &Macd, at: usize) -> bool {
    match (step(&macd.macd, at), step(&macd.signal, at)) {
        (Some((m0, m1)), Some((s0, s1))) => m1 < 0.0 && s1 < 0.0 && m0 < s0 && m1 >= s1,
        _ => false,
    }
}

pub fn macd_sell_signal(macd: &Macd, at: usize) -> bool {
    match (step(&macd.macd, at), step(&macd.signal, at)) {
        (Some((m0, m1)), Some((s0, s1))) => m1 > 0.0 && s1 > 0.0 && m0 > s0 && m1 <= s1,
        _ => false,
    }
}
