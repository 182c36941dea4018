//! Core strategy engine: W/M reversal detection, signal generation,
//! position lifecycle and the sequential backtest simulator.
//!
//! Everything in this crate is deterministic and single-threaded.
//! Parallelism (grid search) and live orchestration live in the
//! `sniperlab-runner` and `sniperlab-live` crates built on top.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod lifecycle;
pub mod params;
pub mod pattern;
pub mod signal_engine;

pub use domain::{Candle, Direction, ExitReason, PatternKind, Position, Timeframe, Trade, TradeSignal};
pub use engine::{run, SimResult};
pub use params::{CapitalMode, ParamError, StrategyParams};
