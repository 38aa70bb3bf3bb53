//! Signal events and the alternation-enforcing signal ledger.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::TradebotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = TradebotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(TradebotError::InvalidSignal {
                reason: format!("unknown side {other:?}"),
            }),
        }
    }
}

/// A recorded buy or sell decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub time: DateTime<Utc>,
    pub product_code: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
}

impl SignalEvent {
    /// The event time is normalized to UTC.
    pub fn new<Tz: TimeZone>(
        time: DateTime<Tz>,
        product_code: &str,
        side: Side,
        price: f64,
        size: f64,
    ) -> Result<Self, TradebotError> {
        if product_code.is_empty() {
            return Err(TradebotError::InvalidSignal {
                reason: "product code is empty".into(),
            });
        }
        if !(price > 0.0) {
            return Err(TradebotError::InvalidSignal {
                reason: format!("price must be positive, got {price}"),
            });
        }
        if !(size > 0.0) {
            return Err(TradebotError::InvalidSignal {
                reason: format!("size must be positive, got {size}"),
            });
        }

        Ok(SignalEvent {
            time: time.with_timezone(&Utc),
            product_code: product_code.to_string(),
            side,
            price,
            size,
        })
    }

    pub fn notional(&self) -> f64 {
        self.price * self.size
    }
}

/// Ordered buy/sell history for one product.
///
/// Sides strictly alternate starting with a buy and timestamps strictly
/// increase; both rules are checked on insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalLedger {
    events: Vec<SignalEvent>,
}

impl SignalLedger {
    pub fn new() -> Self {
        SignalLedger { events: Vec::new() }
    }

    pub fn events(&self) -> &[SignalEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&SignalEvent> {
        self.events.last()
    }

    pub fn can_buy_at(&self, time: DateTime<Utc>) -> bool {
        match self.last() {
            None => true,
            Some(last) => last.side == Side::Sell && last.time < time,
        }
    }

    pub fn can_sell_at(&self, time: DateTime<Utc>) -> bool {
        match self.last() {
            None => false,
            Some(last) => last.side == Side::Buy && last.time < time,
        }
    }

    pub fn add_buy_signal(&mut self, event: SignalEvent) -> Result<(), TradebotError> {
        if event.side != Side::Buy {
            return Err(TradebotError::SignalRejected {
                side: event.side,
                reason: "not a buy event".into(),
            });
        }
        self.check_product(&event)?;
        if !self.can_buy_at(event.time) {
            return Err(TradebotError::SignalRejected {
                side: Side::Buy,
                reason: format!("cannot buy at {}", event.time),
            });
        }
        self.events.push(event);
        Ok(())
    }

    pub fn add_sell_signal(&mut self, event: SignalEvent) -> Result<(), TradebotError> {
        if event.side != Side::Sell {
            return Err(TradebotError::SignalRejected {
                side: event.side,
                reason: "not a sell event".into(),
            });
        }
        self.check_product(&event)?;
        if !self.can_sell_at(event.time) {
            return Err(TradebotError::SignalRejected {
                side: Side::Sell,
                reason: format!("cannot sell at {}", event.time),
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// Routes to `add_buy_signal` or `add_sell_signal` by the event's side.
    pub fn add_signal(&mut self, event: SignalEvent) -> Result<(), TradebotError> {
        match event.side {
            Side::Buy => self.add_buy_signal(event),
            Side::Sell => self.add_sell_signal(event),
        }
    }

    fn check_product(&self, event: &SignalEvent) -> Result<(), TradebotError> {
        match self.events.first() {
            Some(first) if first.product_code != event.product_code => {
                Err(TradebotError::SignalRejected {
                    side: event.side,
                    reason: format!(
                        "ledger holds {}, got {}",
                        first.product_code, event.product_code
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    /// Profit over closed buy/sell pairs. A trailing unmatched buy is left
    /// out: the result is the running total as of the last sell.
    pub fn estimate_profit(&self) -> f64 {
        let mut total = 0.0;
        let mut before_sell = 0.0;
        let mut holding = false;

        for event in &self.events {
            match event.side {
                Side::Buy => {
                    total -= event.notional();
                    holding = true;
                }
                Side::Sell => {
                    total += event.notional();
                    before_sell = total;
                    holding = false;
                }
            }
        }

        if holding { before_sell } else { total }
    }

    /// True when holding a position whose price has fallen at least
    /// `stop_limit_percent` percent below the entry.
    pub fn should_cut_loss(&self, current_price: f64, stop_limit_percent: f64) -> bool {
        match self.last() {
            Some(last) if last.side == Side::Buy => {
                current_price <= last.price * (1.0 - stop_limit_percent / 100.0)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeDelta};

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(day)
    }

    fn event(day: i64, side: Side, price: f64) -> SignalEvent {
        SignalEvent::new(t(day), "BTC_JPY", side, price, 1.0).unwrap()
    }

    #[test]
    fn side_display_and_parse() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn event_time_is_normalized_to_utc() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = jst.with_ymd_and_hms(2021, 1, 1, 9, 0, 0).unwrap();
        let e = SignalEvent::new(local, "BTC_JPY", Side::Buy, 100.0, 1.0).unwrap();
        assert_eq!(e.time, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn event_validation() {
        assert!(SignalEvent::new(t(0), "", Side::Buy, 100.0, 1.0).is_err());
        assert!(SignalEvent::new(t(0), "BTC_JPY", Side::Buy, 0.0, 1.0).is_err());
        assert!(SignalEvent::new(t(0), "BTC_JPY", Side::Buy, 100.0, -1.0).is_err());
        assert!(SignalEvent::new(t(0), "BTC_JPY", Side::Buy, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn empty_ledger_can_only_buy() {
        let ledger = SignalLedger::new();
        assert!(ledger.can_buy_at(t(0)));
        assert!(!ledger.can_sell_at(t(0)));
    }

    #[test]
    fn alternation_is_enforced() {
        let mut ledger = SignalLedger::new();
        assert!(ledger.add_sell_signal(event(0, Side::Sell, 100.0)).is_err());
        ledger.add_buy_signal(event(1, Side::Buy, 100.0)).unwrap();
        assert!(ledger.add_buy_signal(event(2, Side::Buy, 100.0)).is_err());
        ledger.add_sell_signal(event(3, Side::Sell, 110.0)).unwrap();
        assert!(ledger.add_sell_signal(event(4, Side::Sell, 120.0)).is_err());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn same_timestamp_is_rejected() {
        let mut ledger = SignalLedger::new();
        ledger.add_buy_signal(event(1, Side::Buy, 100.0)).unwrap();
        assert!(!ledger.can_sell_at(t(1)));
        assert!(ledger.add_sell_signal(event(1, Side::Sell, 100.0)).is_err());
        assert!(ledger.can_sell_at(t(2)));
    }

    #[test]
    fn wrong_side_for_method_is_rejected() {
        let mut ledger = SignalLedger::new();
        let err = ledger.add_buy_signal(event(1, Side::Sell, 100.0)).unwrap_err();
        assert!(matches!(err, TradebotError::SignalRejected { side: Side::Sell, .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn other_product_is_rejected() {
        let mut ledger = SignalLedger::new();
        ledger.add_buy_signal(event(1, Side::Buy, 100.0)).unwrap();
        let other = SignalEvent::new(t(2), "ETH_JPY", Side::Sell, 100.0, 1.0).unwrap();
        assert!(ledger.add_sell_signal(other).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn add_signal_dispatches_by_side() {
        let mut ledger = SignalLedger::new();
        ledger.add_signal(event(1, Side::Buy, 100.0)).unwrap();
        ledger.add_signal(event(2, Side::Sell, 100.0)).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn estimate_profit_over_closed_pairs() {
        let mut ledger = SignalLedger::new();
        let prices = [1000.0, 2000.0, 10000.0, 20000.0, 100000.0, 200000.0];
        for (i, price) in prices.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            ledger.add_signal(event(i as i64, side, *price)).unwrap();
        }
        assert_eq!(ledger.estimate_profit(), 111000.0);
    }

    #[test]
    fn estimate_profit_ignores_open_position() {
        let mut ledger = SignalLedger::new();
        ledger.add_signal(event(0, Side::Buy, 1000.0)).unwrap();
        ledger.add_signal(event(1, Side::Sell, 1500.0)).unwrap();
        ledger.add_signal(event(2, Side::Buy, 5000.0)).unwrap();
        assert_eq!(ledger.estimate_profit(), 500.0);
    }

    #[test]
    fn only_open_position_is_zero_profit() {
        let mut ledger = SignalLedger::new();
        ledger.add_signal(event(0, Side::Buy, 1000.0)).unwrap();
        assert_eq!(ledger.estimate_profit(), 0.0);
        assert_eq!(SignalLedger::new().estimate_profit(), 0.0);
    }

    #[test]
    fn cut_loss_after_buy() {
        let mut ledger = SignalLedger::new();
        ledger.add_signal(event(0, Side::Buy, 1_000_000.0)).unwrap();
        assert!(ledger.should_cut_loss(500_000.0, 0.6));
        assert!(!ledger.should_cut_loss(999_000.0, 0.6));
        assert!(ledger.should_cut_loss(990_000.0, 0.6));
    }

    #[test]
    fn no_cut_loss_without_position() {
        let mut ledger = SignalLedger::new();
        assert!(!ledger.should_cut_loss(1.0, 0.6));
        ledger.add_signal(event(0, Side::Buy, 100.0)).unwrap();
        ledger.add_signal(event(1, Side::Sell, 100.0)).unwrap();
        assert!(!ledger.should_cut_loss(1.0, 0.6));
    }
}
