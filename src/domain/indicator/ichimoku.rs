//! Ichimoku Kinko Hyo (cloud), computed from closes only.
//!
//! Every line uses the midpoint of the trailing window that ends at the
//! previous bar, `(min + max) / 2` over `closes[i-w..i]`:
//! - tenkan: w = 9, defined for i >= 9
//! - kijun: w = 26, defined for i >= 26
//! - senkou A: (tenkan + kijun) / 2, defined for i >= 26
//! - senkou B: w = 52, defined for i >= 52
//! - chikou: closes[i-26], defined for i >= 26

use crate::domain::indicator::IndicatorError;

pub const TENKAN_WINDOW: usize = 9;
pub const KIJUN_WINDOW: usize = 26;
pub const SENKOU_B_WINDOW: usize = 52;
pub const CHIKOU_LAG: usize = 26;

#[derive(Debug, Clone, PartialEq)]
pub struct Ichimoku {
    pub tenkan: Vec<Option<f64>>,
    pub kijun: Vec<Option<f64>>,
    pub senkou_a: Vec<Option<f64>>,
    pub senkou_b: Vec<Option<f64>>,
    pub chikou: Vec<Option<f64>>,
}

fn trailing_midpoint(closes: &[f64], i: usize, window: usize) -> Option<f64> {
    if i < window {
        return None;
    }
    let slice = &closes[i - window..i];
    let (min, max) = slice
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
            (lo.min(c), hi.max(c))
        });
    Some((min + max) / 2.0)
}

impl Ichimoku {
    pub fn new(closes: &[f64]) -> Result<Self, IndicatorError> {
        if closes.len() < SENKOU_B_WINDOW {
            return Err(IndicatorError::InsufficientData {
                indicator: "ICHIMOKU",
                have: closes.len(),
                need: SENKOU_B_WINDOW,
            });
        }

        let len = closes.len();
        let mut tenkan = Vec::with_capacity(len);
        let mut kijun = Vec::with_capacity(len);
        let mut senkou_a = Vec::with_capacity(len);
        let mut senkou_b = Vec::with_capacity(len);
        let mut chikou = Vec::with_capacity(len);

        for i in 0..len {
            let t = trailing_midpoint(closes, i, TENKAN_WINDOW);
            let k = trailing_midpoint(closes, i, KIJUN_WINDOW);
            tenkan.push(t);
            kijun.push(k);
            senkou_a.push(t.zip(k).map(|(t, k)| (t + k) / 2.0));
            senkou_b.push(trailing_midpoint(closes, i, SENKOU_B_WINDOW));
            chikou.push(i.checked_sub(CHIKOU_LAG).map(|j| closes[j]));
        }

        Ok(Ichimoku {
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou,
        })
    }
}
