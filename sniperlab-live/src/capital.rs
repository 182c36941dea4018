//! Shared capital pool with atomic per-symbol allocation.
//!
//! Symbols trade concurrently but draw from one pool. Every entry
//! reserves capital and every exit releases it in a single step under
//! the ledger lock, so two symbols can never overspend the pool
//! between check and commit.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapitalError {
    #[error("insufficient free capital: requested {requested:.2}, free {free:.2}")]
    InsufficientFunds { requested: f64, free: f64 },
    #[error("symbol {0} has no allocation")]
    UnknownSymbol(String),
}

/// Fraction of the pool never allocated to symbols.
pub const RESERVE_FRACTION: f64 = 0.2;

#[derive(Debug, Default)]
struct LedgerInner {
    /// Per-symbol budget from the last allocation pass.
    budgets: HashMap<String, f64>,
    /// Capital currently locked in open positions, per symbol.
    in_use: HashMap<String, f64>,
}

#[derive(Debug)]
pub struct CapitalLedger {
    total: f64,
    inner: Mutex<LedgerInner>,
}

impl CapitalLedger {
    pub fn new(total: f64) -> Self {
        Self {
            total,
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Distribute the non-reserved pool across symbols proportionally
    /// to their traded volume. Zero total volume splits evenly.
    pub fn allocate(&self, volumes: &HashMap<String, f64>) {
        let mut inner = self.inner.lock().unwrap();
        inner.budgets.clear();
        if volumes.is_empty() {
            return;
        }
        let available = self.total * (1.0 - RESERVE_FRACTION);
        let total_volume: f64 = volumes.values().sum();
        if total_volume <= 0.0 {
            let per_symbol = available / volumes.len() as f64;
            for symbol in volumes.keys() {
                inner.budgets.insert(symbol.clone(), per_symbol);
            }
            return;
        }
        for (symbol, volume) in volumes {
            inner
                .budgets
                .insert(symbol.clone(), available * volume / total_volume);
        }
    }

    /// Symbol's budget from the last allocation pass.
    pub fn budget_of(&self, symbol: &str) -> f64 {
        self.inner
            .lock()
            .unwrap()
            .budgets
            .get(symbol)
            .copied()
            .unwrap_or(0.0)
    }

    /// Atomically reserve capital for an entry. Fails without mutating
    /// anything if the symbol's free budget cannot cover the request.
    pub fn reserve(&self, symbol: &str, amount: f64) -> Result<(), CapitalError> {
        let mut inner = self.inner.lock().unwrap();
        let budget = inner
            .budgets
            .get(symbol)
            .copied()
            .ok_or_else(|| CapitalError::UnknownSymbol(symbol.to_string()))?;
        let used = inner.in_use.get(symbol).copied().unwrap_or(0.0);
        let free = budget - used;
        if amount > free {
            return Err(CapitalError::InsufficientFunds {
                requested: amount,
                free,
            });
        }
        *inner.in_use.entry(symbol.to_string()).or_insert(0.0) += amount;
        Ok(())
    }

    /// Release a symbol's entire reservation on exit.
    pub fn release(&self, symbol: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.in_use.remove(symbol);
    }

    pub fn in_use_of(&self, symbol: &str) -> f64 {
        self.inner
            .lock()
            .unwrap()
            .in_use
            .get(symbol)
            .copied()
            .unwrap_or(0.0)
    }
}
