//! Trade signals and the closed sum types they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction. Signals, positions, and trades all carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for Long, -1.0 for Short. Used by percentage P&L math.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// The reversal geometry that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    /// Double bottom (bullish).
    W,
    /// Double top (bearish).
    M,
}

impl PatternKind {
    pub fn direction(self) -> Direction {
        match self {
            PatternKind::W => Direction::Long,
            PatternKind::M => Direction::Short,
        }
    }
}

/// Why a position closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Initial stop-loss crossed before trailing engaged.
    StopHit,
    /// Trailing stop crossed after the lifecycle entered trailing.
    TrailHit,
    /// Signal expired before it could be consumed (pending-queue only).
    TimeExpired,
}

/// A directional trade proposal produced by the signal engine.
///
/// Read-only once emitted; consumed at most once by the position
/// lifecycle. A signal not consumed before `valid_until` is discarded,
/// never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: Direction,
    pub pattern: PatternKind,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub atr: f64,
    /// Index of the decision candle in the entry series.
    pub candle_index: usize,
    /// When the pattern was confirmed (the sign-flip candle's open time).
    pub detected_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl TradeSignal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }
}
