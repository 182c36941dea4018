//! Result export: ranked optimization tables and trade ledgers.
//!
//! Plain CSV and JSON, consumable by any reporting layer. Nothing here
//! is read back; state is always recomputed from candles and params.

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use sniperlab_core::Trade;

use crate::optimizer::OptimizationResult;

/// Write the ranked results as CSV, one row per parameter tuple.
pub fn write_results_csv(path: &Path, results: &[OptimizationResult]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "rank",
        "score",
        "sharpe",
        "win_rate",
        "simple_return",
        "compound_return",
        "mdd",
        "profit_factor",
        "trades",
        "stability",
        "grade",
        "atr_mult",
        "filter_tf",
        "entry_validity_hours",
        "trail_start_r",
        "trail_dist_r",
    ])?;

    for (rank, r) in results.iter().enumerate() {
        writer.write_record([
            (rank + 1).to_string(),
            format!("{:.4}", r.score),
            format!("{:.2}", r.metrics.sharpe),
            format!("{:.2}", r.metrics.win_rate),
            format!("{:.2}", r.metrics.simple_return),
            format!("{:.2}", r.metrics.compound_return),
            format!("{:.2}", r.metrics.max_drawdown),
            format!("{:.2}", r.metrics.profit_factor),
            r.metrics.trade_count.to_string(),
            r.metrics.stability.to_string(),
            r.metrics.grade.to_string(),
            format!("{:.3}", r.params.atr_mult),
            r.params.filter_tf.to_string(),
            format!("{:.1}", r.params.entry_validity_hours),
            format!("{:.3}", r.params.trail_start_r),
            format!("{:.3}", r.params.trail_dist_r),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the ranked results as a JSON array.
pub fn write_results_json(path: &Path, results: &[OptimizationResult]) -> anyhow::Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let json = serde_json::to_string_pretty(results)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Write a trade ledger as CSV, one row per closed leg.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "entry_time",
        "exit_time",
        "direction",
        "pattern",
        "entry_price",
        "exit_price",
        "pnl_pct",
        "r_multiple",
        "exit_reason",
        "is_addon",
    ])?;

    for t in trades {
        writer.write_record([
            t.entry_time.to_rfc3339(),
            t.exit_time.to_rfc3339(),
            format!("{:?}", t.direction),
            format!("{:?}", t.pattern),
            format!("{:.6}", t.entry_price),
            format!("{:.6}", t.exit_price),
            format!("{:.4}", t.pnl_pct),
            format!("{:.3}", t.r_multiple),
            format!("{:?}", t.exit_reason),
            t.is_addon.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
