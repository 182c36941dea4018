//! Open position state, mutated only by the position lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Lifecycle phase of an open position.
///
/// `Closed` is not represented here: closing destroys the Position and
/// emits Trade records instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Stop is fixed at the initial ATR-derived level.
    Opened,
    /// Extreme price reached the trail trigger; stop follows price.
    Trailing,
}

/// One unit of exposure within a position.
///
/// The first leg is the signal entry; later legs are pullback add-ons.
/// Each leg carries its own entry price and risk basis, and is reported
/// as its own Trade at exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLeg {
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_index: usize,
    pub risk: f64,
    pub is_addon: bool,
}

/// Exactly one Position may be open per (symbol, strategy) pair.
///
/// `risk` is fixed at entry and is the basis for all R-multiple math;
/// `current_stop` may only ever move in the direction that reduces
/// risk (see `tighten_stop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub initial_stop: f64,
    pub current_stop: f64,
    /// Best price reached since entry (highest for Long, lowest for Short).
    pub extreme_price: f64,
    /// |entry_price - initial_stop|, fixed at entry.
    pub risk: f64,
    /// Price level at which the lifecycle transitions to Trailing.
    pub trail_start: f64,
    /// Base trailing distance in price units (risk × trail_dist_r).
    pub trail_dist: f64,
    pub state: LifecycleState,
    pub opened_at: DateTime<Utc>,
    pub entry_index: usize,
    pub legs: Vec<PositionLeg>,
    pub add_count: usize,
}

impl Position {
    /// Open a new position from a filled entry.
    ///
    /// `trail_start_r` and `trail_dist_r` are R-multiples of the fixed risk.
    pub fn open(
        direction: Direction,
        entry_price: f64,
        stop_loss: f64,
        opened_at: DateTime<Utc>,
        entry_index: usize,
        trail_start_r: f64,
        trail_dist_r: f64,
    ) -> Self {
        let risk = (entry_price - stop_loss).abs();
        let trail_start = match direction {
            Direction::Long => entry_price + risk * trail_start_r,
            Direction::Short => entry_price - risk * trail_start_r,
        };
        Self {
            direction,
            entry_price,
            initial_stop: stop_loss,
            current_stop: stop_loss,
            extreme_price: entry_price,
            risk,
            trail_start,
            trail_dist: risk * trail_dist_r,
            state: LifecycleState::Opened,
            opened_at,
            entry_index,
            legs: vec![PositionLeg {
                entry_price,
                entry_time: opened_at,
                entry_index,
                risk,
                is_addon: false,
            }],
            add_count: 0,
        }
    }

    /// Attach a pullback add-on leg with its own risk basis.
    pub fn add_leg(&mut self, entry_price: f64, entry_time: DateTime<Utc>, entry_index: usize) {
        let risk = (entry_price - self.current_stop).abs();
        self.legs.push(PositionLeg {
            entry_price,
            entry_time,
            entry_index,
            risk,
            is_addon: true,
        });
        self.add_count += 1;
    }

    /// Move the stop to `candidate` only if it reduces risk; never loosen.
    /// Returns true if the stop moved.
    pub fn tighten_stop(&mut self, candidate: f64) -> bool {
        let improves = match self.direction {
            Direction::Long => candidate > self.current_stop,
            Direction::Short => candidate < self.current_stop,
        };
        if improves {
            self.current_stop = candidate;
        }
        improves
    }

    /// Whether a candle's range crosses the current stop.
    pub fn stop_crossed(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.current_stop,
            Direction::Short => high >= self.current_stop,
        }
    }
}
