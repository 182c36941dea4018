//! Coarse-to-fine grid optimizer.
//!
//! Stage 1 sweeps a small, wide grid and keeps the best few regions by
//! drawdown-penalized Sharpe. Stage 2 re-sweeps a narrow grid around
//! each kept region and merges everything into one final ranking.
//!
//! Workers share no mutable state: each parameter tuple maps to one
//! immutable result. A failed run is logged and becomes a gap in the
//! ranking, never an abort. For a fixed series and grid the output
//! order is reproducible; ties break on the stable parameter key, not
//! completion order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sniperlab_core::domain::Candle;
use sniperlab_core::{engine, StrategyParams};

use crate::grid::ParamGrid;
use crate::metrics::BacktestMetrics;

/// Drawdown scale constant for the stage-1 composite score.
pub const DRAWDOWN_PENALTY_K: f64 = 5.0;

/// One evaluated parameter tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub params: StrategyParams,
    pub metrics: BacktestMetrics,
    /// Drawdown-penalized Sharpe used for stage-1 region selection.
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Results with fewer trades are statistically insignificant and
    /// dropped before ranking.
    pub min_trades: usize,
    /// Number of stage-1 regions refined in stage 2.
    pub top_regions: usize,
    /// Drawdown budget used for the safe-leverage ranking key.
    pub target_mdd: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_trades: 3,
            top_regions: 5,
            target_mdd: 20.0,
        }
    }
}

/// Sharpe discounted once drawdown exceeds the K scale.
pub fn penalized_score(sharpe: f64, max_drawdown: f64) -> f64 {
    sharpe * (DRAWDOWN_PENALTY_K / max_drawdown.max(DRAWDOWN_PENALTY_K))
}

/// Leverage that would stretch the observed drawdown to the target.
pub fn safe_leverage(target_mdd: f64, max_drawdown: f64) -> f64 {
    target_mdd / max_drawdown.max(0.01)
}

pub struct Optimizer<'a> {
    series: &'a [Candle],
    base: StrategyParams,
    config: OptimizerConfig,
}

impl<'a> Optimizer<'a> {
    pub fn new(series: &'a [Candle], base: StrategyParams, config: OptimizerConfig) -> Self {
        Self {
            series,
            base,
            config,
        }
    }

    /// Full two-stage search. Returns the merged stage-2 results in
    /// final ranking order, or the stage-1 ranking when no region
    /// survives refinement.
    pub fn optimize(&self) -> Vec<OptimizationResult> {
        let coarse = ParamGrid::coarse().expand(&self.base);
        log::info!(
            "stage 1: {} coarse combinations ({} raw)",
            coarse.len(),
            ParamGrid::coarse().combination_count()
        );
        let mut stage1 = self.run_stage(&coarse);
        sort_by_score(&mut stage1);
        log::info!("stage 1 done: {} ranked results", stage1.len());

        if stage1.is_empty() {
            return stage1;
        }

        let mut merged: Vec<OptimizationResult> = Vec::new();
        for (idx, region) in stage1.iter().take(self.config.top_regions).enumerate() {
            let fine = ParamGrid::fine_around(&region.params).expand(&self.base);
            log::info!(
                "stage 2 region {}/{}: {} combinations around {}",
                idx + 1,
                self.config.top_regions.min(stage1.len()),
                fine.len(),
                region.params.key()
            );
            merged.extend(self.run_stage(&fine));
        }

        if merged.is_empty() {
            return stage1;
        }
        self.rank_final(&mut merged);
        merged
    }

    /// Evaluate one batch of parameter tuples in parallel. Failures and
    /// under-the-floor ledgers become gaps; input order is preserved.
    pub fn run_stage(&self, combos: &[StrategyParams]) -> Vec<OptimizationResult> {
        combos
            .par_iter()
            .filter_map(|params| self.evaluate(params))
            .collect()
    }

    fn evaluate(&self, params: &StrategyParams) -> Option<OptimizationResult> {
        let result = match engine::run(self.series, params) {
            Ok(r) => r,
            Err(err) => {
                log::warn!("backtest failed for {}: {err}", params.key());
                return None;
            }
        };
        if result.trades.len() < self.config.min_trades {
            log::debug!(
                "{}: {} trades below floor {}",
                params.key(),
                result.trades.len(),
                self.config.min_trades
            );
            return None;
        }
        let metrics = BacktestMetrics::compute(&result.trades);
        let score = penalized_score(metrics.sharpe, metrics.max_drawdown);
        Some(OptimizationResult {
            params: params.clone(),
            metrics,
            score,
        })
    }

    /// Final ordering: simple return descending, then safe leverage
    /// descending, then drawdown ascending, then the parameter key.
    pub fn rank_final(&self, results: &mut [OptimizationResult]) {
        let target = self.config.target_mdd;
        results.sort_by(|a, b| {
            b.metrics
                .simple_return
                .partial_cmp(&a.metrics.simple_return)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let sl_a = safe_leverage(target, a.metrics.max_drawdown);
                    let sl_b = safe_leverage(target, b.metrics.max_drawdown);
                    sl_b.partial_cmp(&sl_a).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    a.metrics
                        .max_drawdown
                        .partial_cmp(&b.metrics.max_drawdown)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.params.key().cmp(&b.params.key()))
        });
    }
}

/// Stage-1 ordering: penalized score descending, key tie-break.
fn sort_by_score(results: &mut [OptimizationResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.params.key().cmp(&b.params.key()))
    });
}
