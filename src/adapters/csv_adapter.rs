//! CSV file adapters: candle history in, signal events out.

use crate::domain::calendar::parse_timestamp;
use crate::domain::candle::Candle;
use crate::domain::error::TradebotError;
use crate::domain::signal::SignalLedger;
use crate::ports::data_port::CandleSource;
use crate::ports::report_port::SignalSink;
use chrono::{SecondsFormat, TimeDelta};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const CANDLE_HEADER: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];
pub const SIGNAL_HEADER: [&str; 5] = ["time", "product_code", "side", "price", "size"];

/// Reads `<base_path>/<PRODUCT>.csv` with columns
/// `time,open,high,low,close,volume`.
pub struct CsvCandleSource {
    base_path: PathBuf,
    duration: TimeDelta,
}

impl CsvCandleSource {
    /// Daily candles.
    pub fn new(base_path: PathBuf) -> Self {
        Self::with_duration(base_path, TimeDelta::days(1))
    }

    pub fn with_duration(base_path: PathBuf, duration: TimeDelta) -> Self {
        Self {
            base_path,
            duration,
        }
    }

    fn csv_path(&self, product_code: &str) -> PathBuf {
        self.base_path.join(format!("{product_code}.csv"))
    }
}

fn data_error(reason: String) -> TradebotError {
    TradebotError::Data { reason }
}

fn parse_field(record: &csv::StringRecord, index: usize, line: u64) -> Result<f64, TradebotError> {
    let name = CANDLE_HEADER[index];
    record
        .get(index)
        .ok_or_else(|| data_error(format!("line {line}: missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("line {line}: invalid {name} value: {e}")))
}

impl CandleSource for CsvCandleSource {
    fn fetch_candles(
        &self,
        product_code: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>, TradebotError> {
        let path = self.csv_path(product_code);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {e}", path.display())))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;
            let line = record.position().map_or(0, |p| p.line());

            let time_str = record
                .get(0)
                .ok_or_else(|| data_error(format!("line {line}: missing time column")))?;
            let time = parse_timestamp(time_str.trim())?;

            let open = parse_field(&record, 1, line)?;
            let high = parse_field(&record, 2, line)?;
            let low = parse_field(&record, 3, line)?;
            let close = parse_field(&record, 4, line)?;
            let volume = parse_field(&record, 5, line)?;

            let candle = Candle::new(product_code, self.duration, time, open, close, high, low, volume)
                .map_err(|e| data_error(format!("line {line}: {e}")))?;
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.time);
        if let Some(limit) = limit {
            let skip = candles.len().saturating_sub(limit);
            candles.drain(..skip);
        }
        debug!(product = product_code, count = candles.len(), path = %path.display(), "loaded candles");
        Ok(candles)
    }

    fn list_products(&self) -> Result<Vec<String>, TradebotError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ))
        })?;

        let mut products = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(product) = name.strip_suffix(".csv") {
                if !product.is_empty() {
                    products.push(product.to_string());
                }
            }
        }

        products.sort();
        Ok(products)
    }
}

/// Writes a ledger as `time,product_code,side,price,size` with RFC 3339
/// times.
#[derive(Debug, Default)]
pub struct CsvSignalWriter;

impl CsvSignalWriter {
    pub fn new() -> Self {
        CsvSignalWriter
    }
}

impl SignalSink for CsvSignalWriter {
    fn write_signals(&self, ledger: &SignalLedger, output_path: &str) -> Result<(), TradebotError> {
        let write_error = |e: csv::Error| data_error(format!("failed to write {output_path}: {e}"));

        let mut wtr = csv::Writer::from_path(output_path).map_err(write_error)?;
        wtr.write_record(SIGNAL_HEADER).map_err(write_error)?;
        for event in ledger.events() {
            wtr.write_record([
                event.time.to_rfc3339_opts(SecondsFormat::Secs, true),
                event.product_code.clone(),
                event.side.to_string(),
                event.price.to_string(),
                event.size.to_string(),
            ])
            .map_err(write_error)?;
        }
        wtr.flush()?;
        debug!(path = output_path, events = ledger.len(), "wrote signal events");
        Ok(())
    }
}
