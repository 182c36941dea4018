//! Order execution boundary.
//!
//! The orchestrator emits intents; a venue adapter owns submission and
//! its failure handling. On a failed entry the orchestrator keeps its
//! internal state unopened and retries on the next eligible signal; it
//! never assumes a fill it was not told about.

use sniperlab_core::domain::Direction;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("order rejected for {symbol}: {reason}")]
    Rejected { symbol: String, reason: String },
    #[error("venue unreachable: {0}")]
    Unreachable(String),
}

/// An entry or exit the orchestrator wants executed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub direction: Direction,
    /// Notional size in quote currency.
    pub size: f64,
    pub stop_loss: f64,
}

pub trait ExecutionAdapter: Send {
    fn submit_entry(&mut self, intent: &OrderIntent) -> Result<(), ExecError>;
    fn submit_exit(&mut self, intent: &OrderIntent) -> Result<(), ExecError>;
}
