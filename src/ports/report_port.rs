//! Destination for emitted signal events.

use crate::domain::error::TradebotError;
use crate::domain::signal::SignalLedger;

pub trait SignalSink {
    fn write_signals(&self, ledger: &SignalLedger, output_path: &str) -> Result<(), TradebotError>;
}
