//! Strategy parameters and configuration-time validation.
//!
//! Every parameter set is validated once, up front, before any
//! simulation touches it. A bad combination is a `ParamError`, never a
//! silent fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Timeframe;

/// Configuration rejected before any run begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown timeframe '{0}'")]
    UnknownTimeframe(String),
    #[error("filter timeframe {filter} must be strictly longer than entry timeframe {entry}")]
    FilterNotAboveEntry { filter: Timeframe, entry: Timeframe },
    #[error("{name} = {value} outside valid range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
}

/// How realized trade percentages accumulate into an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapitalMode {
    /// Each trade compounds the running equity.
    #[default]
    Compound,
    /// Every trade risks the same fixed fraction of initial equity.
    Fixed,
}

/// Complete parameter set for one strategy run.
///
/// Defaults mirror the production v7.30 tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Entry-series candle timeframe.
    pub entry_tf: Timeframe,
    /// Trend-filter timeframe, strictly longer than `entry_tf`.
    pub filter_tf: Timeframe,
    /// Stop distance in ATR units: stop = entry ∓ atr_mult × ATR.
    pub atr_mult: f64,
    /// Unrealized profit in R at which trailing engages.
    pub trail_start_r: f64,
    /// Trailing stop distance in R behind the extreme price.
    pub trail_dist_r: f64,
    /// A signal unconsumed this many hours after detection is discarded.
    pub entry_validity_hours: f64,
    /// Relative price band within which two pivots count as "comparable".
    pub pattern_tolerance: f64,
    /// Minimum pattern confidence (0..100) to emit a signal.
    pub min_confidence: f64,
    /// Pullback add-on cap per position.
    pub max_adds: usize,
    /// Pure multiplier on net P&L, applied after cost deduction.
    pub leverage: f64,
    /// Round-trip fee + slippage, percent of notional per trade.
    pub round_trip_cost_pct: f64,
    /// Skip entries when ADX on the filter series is below this; 0 disables.
    pub adx_floor: f64,
    pub capital_mode: CapitalMode,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            entry_tf: Timeframe::M15,
            filter_tf: Timeframe::H2,
            atr_mult: 1.25,
            trail_start_r: 0.8,
            trail_dist_r: 0.5,
            entry_validity_hours: 12.0,
            pattern_tolerance: 0.05,
            min_confidence: 60.0,
            max_adds: 1,
            leverage: 1.0,
            round_trip_cost_pct: 0.11,
            adx_floor: 0.0,
            capital_mode: CapitalMode::Compound,
        }
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ParamError> {
    if !value.is_finite() {
        return Err(ParamError::NotFinite { name, value });
    }
    if value < min || value > max {
        return Err(ParamError::OutOfRange { name, value, min, max });
    }
    Ok(())
}

impl StrategyParams {
    /// Validate the full set. Called once before any simulation or
    /// optimization run; a failing combination never reaches a worker.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.filter_tf <= self.entry_tf {
            return Err(ParamError::FilterNotAboveEntry {
                filter: self.filter_tf,
                entry: self.entry_tf,
            });
        }
        check_range("atr_mult", self.atr_mult, 0.1, 10.0)?;
        check_range("trail_start_r", self.trail_start_r, 0.1, 10.0)?;
        check_range("trail_dist_r", self.trail_dist_r, 0.01, 5.0)?;
        check_range("entry_validity_hours", self.entry_validity_hours, 1.0, 168.0)?;
        check_range("pattern_tolerance", self.pattern_tolerance, 0.005, 0.2)?;
        check_range("min_confidence", self.min_confidence, 0.0, 100.0)?;
        check_range("leverage", self.leverage, 1.0, 100.0)?;
        check_range("round_trip_cost_pct", self.round_trip_cost_pct, 0.0, 5.0)?;
        check_range("adx_floor", self.adx_floor, 0.0, 100.0)?;
        Ok(())
    }

    /// Signal validity window as a chrono duration.
    pub fn validity(&self) -> chrono::Duration {
        chrono::Duration::seconds((self.entry_validity_hours * 3600.0) as i64)
    }

    /// Stable identity key for ranking tie-breaks and result tables.
    pub fn key(&self) -> String {
        format!(
            "atr={:.3}|ftf={}|val={:.1}|ts={:.3}|td={:.3}",
            self.atr_mult,
            self.filter_tf,
            self.entry_validity_hours,
            self.trail_start_r,
            self.trail_dist_r
        )
    }
}
