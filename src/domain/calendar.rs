//! Candle time bucketing and exchange timestamp parsing.
//!
//! Daily candles open at a fixed local hour (the trade hour) rather than at
//! UTC midnight. The zone and hour are carried explicitly by
//! [`TradeCalendar`] instead of living in process-wide state.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Timelike, Utc};

use crate::domain::error::TradebotError;

/// Exchange timestamp layout, interpreted as UTC.
pub const EXCHANGE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeCalendar {
    offset: FixedOffset,
    trade_hour: u32,
}

impl TradeCalendar {
    pub fn new(offset: FixedOffset, trade_hour: u32) -> Result<Self, TradebotError> {
        if trade_hour > 23 {
            return Err(TradebotError::ConfigInvalid {
                section: "calendar".into(),
                key: "trade_hour".into(),
                reason: format!("trade_hour must be within 0..=23, got {trade_hour}"),
            });
        }
        Ok(Self { offset, trade_hour })
    }

    /// Builds a calendar from a whole-hour UTC offset, e.g. `9` for JST.
    pub fn from_offset_hours(hours: i32, trade_hour: u32) -> Result<Self, TradebotError> {
        let offset = FixedOffset::east_opt(hours * 3600).ok_or_else(|| {
            TradebotError::ConfigInvalid {
                section: "calendar".into(),
                key: "utc_offset_hours".into(),
                reason: format!("offset out of range: {hours}"),
            }
        })?;
        Self::new(offset, trade_hour)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn trade_hour(&self) -> u32 {
        self.trade_hour
    }

    /// Start of the trading day that contains `time`.
    ///
    /// Times before the trade hour (local) belong to the previous day's bar.
    pub fn bucket(&self, time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = time.with_timezone(&self.offset);
        let mut date = local.date_naive();
        if local.hour() < self.trade_hour {
            date = date.pred_opt()?;
        }
        let start = date.and_hms_opt(self.trade_hour, 0, 0)?;
        self.offset
            .from_local_datetime(&start)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl Default for TradeCalendar {
    /// JST with a 09:00 trade hour.
    fn default() -> Self {
        TradeCalendar {
            offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
            trade_hour: 9,
        }
    }
}

/// Parses an RFC 3339 timestamp, or the exchange layout without a zone
/// (taken as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TradebotError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, EXCHANGE_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| TradebotError::Data {
            reason: format!("invalid timestamp {value:?}: {e}"),
        })
}
