//! Performance metrics — pure functions over trade ledgers.
//!
//! Every metric is a pure function: trade percentages in, scalar out.
//! No dependencies on the optimizer, the grid, or the engine.

use serde::{Deserialize, Serialize};
use sniperlab_core::Trade;

/// Trades-per-year factor for Sharpe annualization. The entry cadence
/// averages a handful of round trips per day on a 15m series, so the
/// classic daily √252 is scaled by 4.
pub const SHARPE_ANNUALIZATION: f64 = 252.0 * 4.0;

/// Quality grade from win rate, profit factor and drawdown combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        };
        f.write_str(s)
    }
}

/// Aggregate performance of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub trade_count: usize,
    /// Percent of trades with positive net P&L.
    pub win_rate: f64,
    /// Sum of per-trade percentages (non-compounding).
    pub simple_return: f64,
    /// Final compounded equity return, floored at -100.
    pub compound_return: f64,
    /// Worst peak-to-trough loss of the compounded curve, percent.
    pub max_drawdown: f64,
    /// Annualized mean/std of per-trade percentages.
    pub sharpe: f64,
    pub profit_factor: f64,
    /// How many of the ledger's three chronological segments were
    /// profitable (0..=3).
    pub stability: u8,
    pub grade: Grade,
    pub avg_trades_per_day: f64,
}

impl BacktestMetrics {
    pub fn compute(trades: &[Trade]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let win_rate = win_rate(&pnls);
        let max_drawdown = max_drawdown(&pnls);
        let profit_factor = profit_factor(&pnls);
        Self {
            trade_count: trades.len(),
            win_rate,
            simple_return: simple_return(&pnls),
            compound_return: compound_return(&pnls),
            max_drawdown,
            sharpe: sharpe_ratio(&pnls),
            profit_factor,
            stability: stability_score(&pnls),
            grade: grade(win_rate, profit_factor, max_drawdown),
            avg_trades_per_day: avg_trades_per_day(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Percent of positive trades. Empty ledger scores 0.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let wins = pnls.iter().filter(|&&p| p > 0.0).count();
    wins as f64 / pnls.len() as f64 * 100.0
}

/// Non-compounding sum of trade percentages.
pub fn simple_return(pnls: &[f64]) -> f64 {
    pnls.iter().sum()
}

/// Compound the trade percentages into an equity curve starting at 1.0.
/// A wipeout pins equity at zero and stops accumulation.
pub fn compound_curve(pnls: &[f64]) -> Vec<f64> {
    let mut equity = 1.0f64;
    let mut curve = Vec::with_capacity(pnls.len() + 1);
    curve.push(equity);
    for &p in pnls {
        equity *= 1.0 + p / 100.0;
        if equity <= 0.0 {
            curve.push(0.0);
            break;
        }
        curve.push(equity);
    }
    curve
}

/// Final compounded return in percent, floored at -100.
pub fn compound_return(pnls: &[f64]) -> f64 {
    let curve = compound_curve(pnls);
    let last = curve.last().copied().unwrap_or(1.0);
    ((last - 1.0) * 100.0).max(-100.0)
}

/// Max drawdown of the compounded curve, percent, capped at 100.
pub fn max_drawdown(pnls: &[f64]) -> f64 {
    let curve = compound_curve(pnls);
    let mut peak = 1.0f64;
    let mut mdd = 0.0f64;
    for &v in &curve {
        if v > peak {
            peak = v;
        }
        let dd = if peak > 1e-9 {
            (peak - v) / peak * 100.0
        } else {
            100.0
        };
        if dd > mdd {
            mdd = dd;
        }
    }
    mdd.min(100.0)
}

/// Annualized Sharpe over per-trade returns.
/// Returns 0.0 for fewer than 2 trades or zero variance.
pub fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let mean = pnls.iter().sum::<f64>() / pnls.len() as f64;
    let var = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (pnls.len() - 1) as f64;
    let std = var.sqrt();
    if std < 1e-9 {
        return 0.0;
    }
    mean / std * SHARPE_ANNUALIZATION.sqrt()
}

/// Gross gains over gross losses. No losses → infinity.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gains: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let losses: f64 = -pnls.iter().filter(|&&p| p < 0.0).sum::<f64>();
    if losses > 0.0 {
        gains / losses
    } else if gains > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Split the ledger into three chronological thirds and count the
/// profitable ones. Fewer than 3 trades scores 0.
pub fn stability_score(pnls: &[f64]) -> u8 {
    let n = pnls.len();
    if n < 3 {
        return 0;
    }
    let p1: f64 = pnls[..n / 3].iter().sum();
    let p2: f64 = pnls[n / 3..2 * n / 3].iter().sum();
    let p3: f64 = pnls[2 * n / 3..].iter().sum();
    [p1, p2, p3].iter().filter(|&&p| p > 0.0).count() as u8
}

/// S: WR 80%+, PF 3.0+, MDD ≤10. A: 70/2.0/15. B: 60/1.5/20. Else C.
pub fn grade(win_rate: f64, profit_factor: f64, max_drawdown: f64) -> Grade {
    let mdd = max_drawdown.abs();
    if win_rate >= 80.0 && profit_factor >= 3.0 && mdd <= 10.0 {
        Grade::S
    } else if win_rate >= 70.0 && profit_factor >= 2.0 && mdd <= 15.0 {
        Grade::A
    } else if win_rate >= 60.0 && profit_factor >= 1.5 && mdd <= 20.0 {
        Grade::B
    } else {
        Grade::C
    }
}

/// Trades per day over the ledger's entry-time span.
pub fn avg_trades_per_day(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let first = trades.first().unwrap().entry_time;
    let last = trades.last().unwrap().entry_time;
    let days = ((last - first).num_days()).max(1) as f64;
    (trades.len() as f64 / days * 100.0).round() / 100.0
}
