//! Completed trade records, one per closed position leg.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{Direction, ExitReason, PatternKind};

/// One closed leg of a position. Add-on legs produce their own Trade
/// with `is_addon = true`; reporting aggregates them by position if
/// needed, the simulator never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub pattern: PatternKind,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub exit_reason: ExitReason,
    /// Net percentage return after round-trip cost and leverage.
    pub pnl_pct: f64,
    /// Gross return divided by this leg's risk basis.
    pub r_multiple: f64,
    pub is_addon: bool,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl_pct > 0.0
    }

    pub fn holding_time(&self) -> chrono::Duration {
        self.exit_time - self.entry_time
    }
}
