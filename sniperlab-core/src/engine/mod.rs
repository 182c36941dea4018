//! Backtest engine.

pub mod simulator;

pub use simulator::{run, SimResult};
