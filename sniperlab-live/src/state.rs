//! Per-symbol trading state machine.
//!
//! WAIT ⇄ WATCH ⇄ READY → IN_POSITION → WAIT, with a terminal EXCLUDED
//! reachable only from WAIT/WATCH at initialization time.

use serde::{Deserialize, Serialize};
use sniperlab_core::domain::{Candle, Position};

/// Readiness score at which a symbol becomes WATCH.
pub const WATCH_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolStatus {
    /// No actionable setup.
    Wait,
    /// Setup forming; readiness above the watch floor.
    Watch,
    /// Readiness above the entry threshold; entry being attempted.
    Ready,
    InPosition,
    /// Historical win rate below the floor. Terminal.
    Excluded,
}

/// Everything the orchestrator tracks per symbol.
#[derive(Debug)]
pub struct SymbolState {
    pub symbol: String,
    pub status: SymbolStatus,
    pub readiness: f64,
    /// Win rate measured on the initialization backtest.
    pub backtest_win_rate: f64,
    pub position: Option<Position>,
    /// Trailing entry-timeframe candles, bounded by the orchestrator.
    pub candles: Vec<Candle>,
    /// Set false on feed failure; the symbol is skipped until the feed
    /// recovers.
    pub feed_healthy: bool,
}

impl SymbolState {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            status: SymbolStatus::Wait,
            readiness: 0.0,
            backtest_win_rate: 0.0,
            position: None,
            candles: Vec::new(),
            feed_healthy: true,
        }
    }

    /// Exclusion is terminal and only reachable before a position was
    /// ever opened.
    pub fn exclude(&mut self) -> bool {
        match self.status {
            SymbolStatus::Wait | SymbolStatus::Watch => {
                self.status = SymbolStatus::Excluded;
                self.readiness = 0.0;
                true
            }
            _ => false,
        }
    }

    /// Re-classify from a fresh readiness score. Never touches
    /// IN_POSITION or EXCLUDED.
    pub fn apply_readiness(&mut self, readiness: f64, entry_threshold: f64) {
        self.readiness = readiness;
        match self.status {
            SymbolStatus::InPosition | SymbolStatus::Excluded => {}
            _ => {
                self.status = if readiness >= entry_threshold {
                    SymbolStatus::Ready
                } else if readiness >= WATCH_THRESHOLD {
                    SymbolStatus::Watch
                } else {
                    SymbolStatus::Wait
                };
            }
        }
    }

    pub fn enter_position(&mut self, position: Position) {
        self.position = Some(position);
        self.status = SymbolStatus::InPosition;
    }

    /// Back to WAIT after an exit; readiness is recomputed next cycle.
    pub fn clear_position(&mut self) {
        self.position = None;
        self.status = SymbolStatus::Wait;
        self.readiness = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_drives_wait_watch_ready() {
        let mut s = SymbolState::new("BTCUSDT");
        s.apply_readiness(30.0, 90.0);
        assert_eq!(s.status, SymbolStatus::Wait);
        s.apply_readiness(60.0, 90.0);
        assert_eq!(s.status, SymbolStatus::Watch);
        s.apply_readiness(92.0, 90.0);
        assert_eq!(s.status, SymbolStatus::Ready);
        s.apply_readiness(10.0, 90.0);
        assert_eq!(s.status, SymbolStatus::Wait);
    }

    #[test]
    fn exclusion_is_terminal() {
        let mut s = SymbolState::new("DOGEUSDT");
        assert!(s.exclude());
        assert_eq!(s.status, SymbolStatus::Excluded);
        s.apply_readiness(99.0, 90.0);
        assert_eq!(s.status, SymbolStatus::Excluded);
    }

    #[test]
    fn cannot_exclude_while_in_position() {
        use chrono::TimeZone;
        use sniperlab_core::domain::Direction;
        let mut s = SymbolState::new("ETHUSDT");
        let t = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        s.enter_position(Position::open(Direction::Long, 100.0, 95.0, t, 0, 1.0, 0.5));
        assert!(!s.exclude());
        assert_eq!(s.status, SymbolStatus::InPosition);
    }

    #[test]
    fn readiness_does_not_disturb_open_position() {
        use chrono::TimeZone;
        use sniperlab_core::domain::Direction;
        let mut s = SymbolState::new("ETHUSDT");
        let t = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        s.enter_position(Position::open(Direction::Long, 100.0, 95.0, t, 0, 1.0, 0.5));
        s.apply_readiness(95.0, 90.0);
        assert_eq!(s.status, SymbolStatus::InPosition);
    }
}
