//! SniperLab CLI — backtest and parameter optimization over CSV candles.
//!
//! Commands:
//! - `backtest` — run one backtest from a CSV candle file and print metrics
//! - `optimize` — coarse-to-fine grid search, results written as CSV + JSON

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use sniperlab_core::domain::{is_strictly_ordered, Candle};
use sniperlab_core::{run, StrategyParams};
use sniperlab_runner::export::{write_results_csv, write_results_json, write_trades_csv};
use sniperlab_runner::{BacktestMetrics, OptimizationResult, Optimizer, OptimizerConfig};

#[derive(Parser)]
#[command(
    name = "sniperlab",
    about = "SniperLab CLI — W/M reversal backtesting and optimization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest and print metrics plus the trade ledger.
    Backtest {
        /// CSV candle file (timestamp,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,

        /// TOML parameter file. Missing keys fall back to defaults.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Write the trade ledger as CSV here.
        #[arg(long)]
        trades_out: Option<PathBuf>,
    },
    /// Coarse-to-fine grid optimization.
    Optimize {
        /// CSV candle file (timestamp,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,

        /// TOML parameter file used as the base for the grid.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Minimum trades a combination needs to be ranked.
        #[arg(long, default_value_t = 3)]
        min_trades: usize,

        /// Number of stage-1 regions refined in stage 2.
        #[arg(long, default_value_t = 5)]
        top_regions: usize,

        /// Output directory for results.csv and results.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// How many ranked rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            data,
            params,
            trades_out,
        } => run_backtest_cmd(&data, params.as_deref(), trades_out.as_deref()),
        Commands::Optimize {
            data,
            params,
            min_trades,
            top_regions,
            output_dir,
            top,
        } => run_optimize_cmd(
            &data,
            params.as_deref(),
            min_trades,
            top_regions,
            &output_dir,
            top,
        ),
    }
}

fn run_backtest_cmd(
    data: &Path,
    params_path: Option<&Path>,
    trades_out: Option<&Path>,
) -> Result<()> {
    let candles = load_candles_csv(data)?;
    let params = load_params(params_path)?;

    let result = run(&candles, &params)?;
    let metrics = BacktestMetrics::compute(&result.trades);
    print_metrics(&metrics);

    if let Some(path) = trades_out {
        write_trades_csv(path, &result.trades)?;
        println!("Trades saved to: {}", path.display());
    }

    Ok(())
}

fn run_optimize_cmd(
    data: &Path,
    params_path: Option<&Path>,
    min_trades: usize,
    top_regions: usize,
    output_dir: &Path,
    top: usize,
) -> Result<()> {
    let candles = load_candles_csv(data)?;
    let base = load_params(params_path)?;

    let config = OptimizerConfig {
        min_trades,
        top_regions,
        ..OptimizerConfig::default()
    };
    let optimizer = Optimizer::new(&candles, base, config);
    let results = optimizer.optimize();

    if results.is_empty() {
        bail!("no parameter combination produced enough trades to rank");
    }

    print_leaderboard(&results, top);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let csv_path = output_dir.join("results.csv");
    let json_path = output_dir.join("results.json");
    write_results_csv(&csv_path, &results)?;
    write_results_json(&json_path, &results)?;
    println!();
    println!("Results saved to: {}", output_dir.display());

    Ok(())
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Parse an RFC 3339 timestamp, falling back to unix seconds or
/// milliseconds.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let n: i64 = raw
        .parse()
        .with_context(|| format!("unparseable timestamp '{raw}'"))?;
    // Millisecond epochs passed 10^12 back in 2001.
    let ts = if n >= 1_000_000_000_000 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    };
    ts.with_context(|| format!("timestamp '{raw}' out of range"))
}

fn load_candles_csv(path: &Path) -> Result<Vec<Candle>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;

    let mut candles = Vec::new();
    for row in reader.deserialize() {
        let row: CsvRow = row.with_context(|| format!("reading {}", path.display()))?;
        let candle = Candle {
            ts: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !candle.is_sane() {
            bail!("malformed candle at {} in {}", row.timestamp, path.display());
        }
        candles.push(candle);
    }

    if candles.is_empty() {
        bail!("no candles in {}", path.display());
    }
    if !is_strictly_ordered(&candles) {
        bail!("candles in {} are not strictly time-ordered", path.display());
    }
    Ok(candles)
}

fn load_params(path: Option<&Path>) -> Result<StrategyParams> {
    let Some(path) = path else {
        return Ok(StrategyParams::default());
    };
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let params: StrategyParams =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    params.validate()?;
    Ok(params)
}

fn print_metrics(metrics: &BacktestMetrics) {
    println!();
    println!("=== Backtest Result ===");
    println!("Trades:          {}", metrics.trade_count);
    println!("Win Rate:        {:.1}%", metrics.win_rate);
    println!("Simple Return:   {:.2}%", metrics.simple_return);
    println!("Compound Return: {:.2}%", metrics.compound_return);
    println!("Max Drawdown:    {:.2}%", metrics.max_drawdown);
    println!("Sharpe:          {:.3}", metrics.sharpe);
    println!("Profit Factor:   {:.2}", metrics.profit_factor);
    println!("Stability:       {}/3", metrics.stability);
    println!("Grade:           {}", metrics.grade);
    println!("Trades/Day:      {:.2}", metrics.avg_trades_per_day);
}

fn print_leaderboard(results: &[OptimizationResult], top: usize) {
    println!();
    println!(
        "{:<4} {:>8} {:>8} {:>8} {:>7} {:>6}  {}",
        "Rank", "Return%", "MDD%", "Sharpe", "Trades", "Grade", "Params"
    );
    println!("{}", "-".repeat(72));
    for (i, r) in results.iter().take(top).enumerate() {
        println!(
            "{:<4} {:>8.2} {:>8.2} {:>8.3} {:>7} {:>6}  {}",
            i + 1,
            r.metrics.simple_return,
            r.metrics.max_drawdown,
            r.metrics.sharpe,
            r.metrics.trade_count,
            r.metrics.grade,
            r.params.key(),
        );
    }
}
