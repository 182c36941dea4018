//! Parameter grids for the coarse-to-fine search.
//!
//! A grid is a cartesian product over the five searched parameters.
//! Expansion filters out both invalid configurations (ParamError) and
//! incoherent interactions, so the optimizer only ever sees tuples
//! worth running.

use sniperlab_core::domain::Timeframe;
use sniperlab_core::StrategyParams;

/// Value lists per searched parameter. Unsearched parameters come from
/// the base configuration at expansion time.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub atr_mult: Vec<f64>,
    pub filter_tf: Vec<Timeframe>,
    pub entry_validity_hours: Vec<f64>,
    pub trail_start_r: Vec<f64>,
    pub trail_dist_r: Vec<f64>,
}

impl ParamGrid {
    /// Stage-1 grid: small and wide, a few hundred combinations.
    pub fn coarse() -> Self {
        Self {
            atr_mult: vec![0.9, 1.0, 1.1, 1.25],
            filter_tf: vec![
                Timeframe::H4,
                Timeframe::H6,
                Timeframe::H8,
                Timeframe::H12,
            ],
            entry_validity_hours: vec![48.0, 72.0],
            trail_start_r: vec![0.4, 0.6, 0.8, 1.0],
            trail_dist_r: vec![0.03, 0.05, 0.08, 0.1],
        }
    }

    /// Stage-2 grid around one coarse optimum: ±30% on trail_start_r
    /// (9 points), ±25% on trail_dist_r (7 points), ±15% on atr_mult
    /// (5 points), one ordinal step on filter_tf, validity pinned.
    pub fn fine_around(center: &StrategyParams) -> Self {
        Self {
            atr_mult: linspace_n(center.atr_mult * 0.85, center.atr_mult * 1.15, 5),
            filter_tf: center.filter_tf.neighbors(1),
            entry_validity_hours: vec![center.entry_validity_hours],
            trail_start_r: linspace_n(center.trail_start_r * 0.7, center.trail_start_r * 1.3, 9),
            trail_dist_r: linspace_n(center.trail_dist_r * 0.75, center.trail_dist_r * 1.25, 7),
        }
    }

    /// Cartesian expansion over a base configuration. Tuples that fail
    /// parameter validation or interaction coherence are dropped here,
    /// before any worker sees them. Output order is deterministic.
    pub fn expand(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        let mut out = Vec::new();
        for &atr_mult in &self.atr_mult {
            for &filter_tf in &self.filter_tf {
                for &entry_validity_hours in &self.entry_validity_hours {
                    for &trail_start_r in &self.trail_start_r {
                        for &trail_dist_r in &self.trail_dist_r {
                            let p = StrategyParams {
                                atr_mult,
                                filter_tf,
                                entry_validity_hours,
                                trail_start_r,
                                trail_dist_r,
                                ..base.clone()
                            };
                            if p.validate().is_ok() && interaction_valid(&p) {
                                out.push(p);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Raw combination count before any filtering.
    pub fn combination_count(&self) -> usize {
        self.atr_mult.len()
            * self.filter_tf.len()
            * self.entry_validity_hours.len()
            * self.trail_start_r.len()
            * self.trail_dist_r.len()
    }
}

/// Interaction coherence rules between searched parameters:
/// 1. atr_mult × trail_start_r within [0.5, 2.5]
/// 2. long filter timeframes cap the validity window
/// 3. trail_start_r / trail_dist_r within [3, 20]
pub fn interaction_valid(p: &StrategyParams) -> bool {
    let product = p.atr_mult * p.trail_start_r;
    if !(0.5..=2.5).contains(&product) {
        return false;
    }

    if p.filter_tf == Timeframe::H12 && p.entry_validity_hours > 24.0 {
        return false;
    }
    if p.filter_tf == Timeframe::D1 && p.entry_validity_hours > 48.0 {
        return false;
    }

    if p.trail_dist_r > 0.0 {
        let ratio = p.trail_start_r / p.trail_dist_r;
        if !(3.0..=20.0).contains(&ratio) {
            return false;
        }
    }

    true
}

/// N evenly spaced points, rounded to 3 decimals.
fn linspace_n(min: f64, max: f64, n: usize) -> Vec<f64> {
    let round3 = |v: f64| (v * 1000.0).round() / 1000.0;
    if n <= 1 {
        return vec![round3((min + max) / 2.0)];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n).map(|i| round3(min + i as f64 * step)).collect()
}
