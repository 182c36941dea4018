//! Parallel grid optimization and reporting over the core engine.

pub mod export;
pub mod grid;
pub mod metrics;
pub mod optimizer;

pub use grid::ParamGrid;
pub use metrics::{BacktestMetrics, Grade};
pub use optimizer::{OptimizationResult, Optimizer, OptimizerConfig};
