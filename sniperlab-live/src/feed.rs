//! Candle feed abstraction and the bounded subscription rotation.
//!
//! The orchestrator never talks to a venue directly; it pulls closed
//! candles from a `CandleFeed`. Live subscriptions are a scarce
//! resource, so symbols beyond the budget are rotated through the feed
//! instead of all held open at once.

use std::collections::VecDeque;

use sniperlab_core::domain::Candle;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("feed unavailable for {0}")]
    Unavailable(String),
    #[error("malformed candle for {symbol}: {detail}")]
    Malformed { symbol: String, detail: String },
}

/// Source of closed entry-timeframe candles.
///
/// `poll` returns `Ok(None)` when no new candle has closed yet. An
/// error marks the symbol unavailable; the orchestrator skips it each
/// cycle until a later poll succeeds.
pub trait CandleFeed: Send {
    fn poll(&mut self, symbol: &str) -> Result<Option<Candle>, FeedError>;
}

/// Round-robin rotation over a fixed subscription budget.
///
/// The active window holds at most `budget` symbols; `rotate` retires
/// the oldest active symbol and admits the next queued one.
#[derive(Debug)]
pub struct SubscriptionRotation {
    budget: usize,
    active: VecDeque<String>,
    queued: VecDeque<String>,
}

impl SubscriptionRotation {
    pub fn new(symbols: Vec<String>, budget: usize) -> Self {
        let budget = budget.max(1);
        let mut active = VecDeque::new();
        let mut queued = VecDeque::new();
        for symbol in symbols {
            if active.len() < budget {
                active.push_back(symbol);
            } else {
                queued.push_back(symbol);
            }
        }
        Self {
            budget,
            active,
            queued,
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn is_active(&self, symbol: &str) -> bool {
        self.active.iter().any(|s| s == symbol)
    }

    /// One rotation step. No-op while everything fits in the budget.
    pub fn rotate(&mut self) {
        if self.queued.is_empty() {
            return;
        }
        if let Some(retired) = self.active.pop_front() {
            self.queued.push_back(retired);
        }
        if let Some(next) = self.queued.pop_front() {
            self.active.push_back(next);
        }
    }

    /// Drop a symbol from the rotation entirely (exclusion).
    pub fn remove(&mut self, symbol: &str) {
        self.active.retain(|s| s != symbol);
        self.queued.retain(|s| s != symbol);
        if self.active.len() < self.budget {
            if let Some(next) = self.queued.pop_front() {
                self.active.push_back(next);
            }
        }
    }
}
