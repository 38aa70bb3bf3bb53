//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter::{CsvCandleSource, CsvSignalWriter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::backtest;
use crate::domain::calendar::parse_timestamp;
use crate::domain::config::{load_calendar, load_optimizer_settings, load_trade_params};
use crate::domain::error::TradebotError;
use crate::domain::optimizer::{CancelToken, OptimizeAllReport, Optimizer};
use crate::domain::params::TradeParams;
use crate::domain::series::CandleSeries;
use crate::ports::data_port::CandleSource;
use crate::ports::report_port::SignalSink;

#[derive(Parser, Debug)]
#[command(name = "tradebot", about = "Indicator-driven crypto trading backtester and optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured parameters over a candle history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <PRODUCT>.csv candle files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        product: Option<String>,
        /// Use only the most recent N candles
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write the emitted signal events to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search indicator parameters for the best backtest profit
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        product: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Evaluate grid points on a single thread
        #[arg(long)]
        sequential: bool,
    },
    /// Validate the [params] section of a config file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the daily candle bucket a timestamp falls into
    Bucket {
        #[arg(short, long)]
        time: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            product,
            limit,
            output,
        } => run_backtest(&config, &data, product.as_deref(), limit, output.as_deref()),
        Command::Optimize {
            config,
            data,
            product,
            timeout_secs,
            sequential,
        } => run_optimize(&config, &data, product.as_deref(), timeout_secs, sequential),
        Command::Validate { config } => run_validate(&config),
        Command::Bucket { time, config } => run_bucket(&time, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradebotError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn load_params(config: &FileConfigAdapter, product: Option<&str>) -> Result<TradeParams, TradebotError> {
    let mut params = load_trade_params(config)?;
    if let Some(product) = product {
        params.product_code = product.to_string();
        params.validate()?;
    }
    Ok(params)
}

fn load_series(data: &Path, product_code: &str, limit: Option<usize>) -> Result<CandleSeries, TradebotError> {
    let source = CsvCandleSource::new(data.to_path_buf());
    let candles = source.fetch_candles(product_code, limit)?;
    if candles.is_empty() {
        return Err(TradebotError::NoData {
            product_code: product_code.to_string(),
        });
    }
    eprintln!("Loaded {} candles for {}", candles.len(), product_code);
    CandleSeries::new(product_code, candles)
}

fn run_backtest(
    config_path: &Path,
    data: &Path,
    product: Option<&str>,
    limit: Option<usize>,
    output: Option<&Path>,
) -> Result<(), TradebotError> {
    let config = load_config(config_path)?;
    let params = load_params(&config, product)?;
    let mut series = load_series(data, &params.product_code, limit)?;

    let effective = series.attach_indicators(&params);
    let profit = backtest(&mut series, &effective);

    if let Some(ledger) = series.backtest_events() {
        for event in ledger.events() {
            println!(
                "{}  {:<4}  price={}  size={}",
                event.time.to_rfc3339(),
                event.side,
                event.price,
                event.size
            );
        }
        println!("events: {}", ledger.len());

        if let Some(path) = output {
            let path = path.to_string_lossy();
            CsvSignalWriter::new().write_signals(ledger, &path)?;
            eprintln!("Signals written to {path}");
        }
    }
    println!("profit: {profit:.2}");
    Ok(())
}

fn run_optimize(
    config_path: &Path,
    data: &Path,
    product: Option<&str>,
    timeout_secs: Option<u64>,
    sequential: bool,
) -> Result<(), TradebotError> {
    let config = load_config(config_path)?;
    let params = load_params(&config, product)?;
    let mut settings = load_optimizer_settings(&config)?;
    if let Some(secs) = timeout_secs {
        settings.timeout = Some(Duration::from_secs(secs));
    }
    if sequential {
        settings.parallel = false;
    }

    let series = load_series(data, &params.product_code, None)?;
    let cancel = settings.timeout.map(CancelToken::with_timeout).unwrap_or_default();
    let optimizer = Optimizer::new(settings.space)
        .with_parallelism(settings.parallel)
        .with_cancel_token(cancel);

    eprintln!("Optimizing {} over {} candles...", params.product_code, series.len());
    let ichimoku = optimizer.optimize_ichimoku(&series, params.size)?;
    let (updated, report) = optimizer.optimize_all(&series, &params)?;

    print_report(&report);
    println!("ichimoku  performance={:.2}", ichimoku.performance);
    print_params(&updated);
    println!("changed: {}", report.changed());
    Ok(())
}

fn print_report(report: &OptimizeAllReport) {
    let ema = &report.ema;
    println!(
        "ema       performance={:.2}  fast={} slow={}  changed={}",
        ema.performance, ema.params.fast, ema.params.slow, ema.changed
    );
    let bb = &report.bbands;
    println!(
        "bbands    performance={:.2}  n={} k={:.1}  changed={}",
        bb.performance, bb.params.n, bb.params.k, bb.changed
    );
    let rsi = &report.rsi;
    println!(
        "rsi       performance={:.2}  period={} buy={} sell={}  changed={}",
        rsi.performance,
        rsi.params.period,
        rsi.params.buy_threshold,
        rsi.params.sell_threshold,
        rsi.changed
    );
    let macd = &report.macd;
    println!(
        "macd      performance={:.2}  fast={} slow={} signal={}  changed={}",
        macd.performance, macd.params.fast, macd.params.slow, macd.params.signal, macd.changed
    );
}

/// Prints parameters as a `[params]` section that can be pasted back into
/// a config file.
fn print_params(params: &TradeParams) {
    println!("[params]");
    println!("product_code = {}", params.product_code);
    println!("size = {}", params.size);
    println!("trade_enable = {}", params.trade_enable);
    println!("stop_limit_percent = {}", params.stop_limit_percent);
    println!("sma_enable = {}", params.sma.enabled);
    println!("ema_enable = {}", params.ema.enabled);
    println!("ema_period1 = {}", params.ema.period1);
    println!("ema_period2 = {}", params.ema.period2);
    println!("bbands_enable = {}", params.bbands.enabled);
    println!("bbands_n = {}", params.bbands.n);
    println!("bbands_k = {}", params.bbands.k);
    println!("ichimoku_enable = {}", params.ichimoku.enabled);
    println!("rsi_enable = {}", params.rsi.enabled);
    println!("rsi_period = {}", params.rsi.period);
    println!("rsi_buy_threshold = {}", params.rsi.buy_threshold);
    println!("rsi_sell_threshold = {}", params.rsi.sell_threshold);
    println!("macd_enable = {}", params.macd.enabled);
    println!("macd_fast_period = {}", params.macd.fast_period);
    println!("macd_slow_period = {}", params.macd.slow_period);
    println!("macd_signal_period = {}", params.macd.signal_period);
}

fn run_validate(config_path: &Path) -> Result<(), TradebotError> {
    let config = load_config(config_path)?;
    let params = load_trade_params(&config)?;
    load_optimizer_settings(&config)?;
    load_calendar(&config)?;

    println!("Config is valid.");
    println!("  product: {}", params.product_code);
    println!("  size: {}", params.size);
    println!("  trade enabled: {}", params.trade_enable);
    if !params.any_family_enabled() {
        eprintln!("warning: no indicator family is enabled");
    }
    Ok(())
}

fn run_bucket(time: &str, config_path: Option<&Path>) -> Result<(), TradebotError> {
    let calendar = match config_path {
        Some(path) => load_calendar(&load_config(path)?)?,
        None => Default::default(),
    };
    let time = parse_timestamp(time)?;
    let bucket = calendar.bucket(time).ok_or_else(|| TradebotError::Data {
        reason: format!("cannot bucket {time}"),
    })?;
    println!("{}", bucket.to_rfc3339());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_optimize_flags() {
        let cli = Cli::try_parse_from([
            "tradebot",
            "optimize",
            "--config",
            "t.ini",
            "--data",
            "data",
            "--timeout-secs",
            "5",
            "--sequential",
        ])
        .unwrap();
        match cli.command {
            Command::Optimize {
                timeout_secs,
                sequential,
                product,
                ..
            } => {
                assert_eq!(timeout_secs, Some(5));
                assert!(sequential);
                assert_eq!(product, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn backtest_requires_data_dir() {
        assert!(Cli::try_parse_from(["tradebot", "backtest", "--config", "t.ini"]).is_err());
    }
}
