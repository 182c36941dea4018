//! Position lifecycle: OPENED → TRAILING → CLOSED.
//!
//! All price decisions here are conservative. Exits fill at the stop
//! level or the candle open, whichever is worse for the position; the
//! stop only ever tightens; and every check at candle i consumes
//! indicator values from candle i-1, since candle i's own indicators
//! do not exist until it closes.

use chrono::{DateTime, Utc};

use crate::domain::{
    Candle, Direction, ExitReason, LifecycleState, PatternKind, Position, Trade,
};
use crate::params::StrategyParams;

/// RSI period shared by trailing and pullback logic.
pub const RSI_PERIOD: usize = 14;
/// RSI below which a Long pullback add-on may fire.
pub const PULLBACK_RSI_LONG: f64 = 35.0;
/// RSI above which a Short pullback add-on may fire.
pub const PULLBACK_RSI_SHORT: f64 = 65.0;
/// RSI above which a Long trail widens to double distance.
pub const TRAIL_WIDE_RSI_LONG: f64 = 70.0;
/// RSI below which a Short trail widens to double distance.
pub const TRAIL_WIDE_RSI_SHORT: f64 = 30.0;

/// Trailing distance multiplier from the previous candle's RSI.
///
/// Overbought continuation (for Long) gets double the distance to let
/// the move run; a fading RSI below the midline pulls the stop to 0.8x.
pub fn trail_multiplier(direction: Direction, prev_rsi: f64) -> f64 {
    if prev_rsi.is_nan() {
        return 1.0;
    }
    match direction {
        Direction::Long => {
            if prev_rsi > TRAIL_WIDE_RSI_LONG {
                2.0
            } else if prev_rsi < 50.0 {
                0.8
            } else {
                1.0
            }
        }
        Direction::Short => {
            if prev_rsi < TRAIL_WIDE_RSI_SHORT {
                2.0
            } else if prev_rsi > 50.0 {
                0.8
            } else {
                1.0
            }
        }
    }
}

/// Check whether `candle` stops the position out. On a hit, returns the
/// closed legs as trades; the caller drops the Position.
pub fn check_exit(pos: &Position, candle: &Candle, params: &StrategyParams) -> Option<Vec<Trade>> {
    if !pos.stop_crossed(candle.high, candle.low) {
        return None;
    }
    // Gap through the stop fills at the open, not at the stop level.
    let exit_price = match pos.direction {
        Direction::Long => pos.current_stop.min(candle.open),
        Direction::Short => pos.current_stop.max(candle.open),
    };
    let reason = match pos.state {
        LifecycleState::Trailing => ExitReason::TrailHit,
        LifecycleState::Opened => ExitReason::StopHit,
    };
    Some(close_all(pos, exit_price, candle.ts, reason, params))
}

/// After a survived candle, absorb its extreme and tighten the stop if
/// trailing is (or becomes) engaged.
///
/// The candidate stop is recomputed every candle, not only on new
/// extremes: a shrinking RSI multiplier can tighten the stop from an
/// unchanged extreme.
pub fn update_trailing(pos: &mut Position, candle: &Candle, prev_rsi: f64) {
    let new_extreme = match pos.direction {
        Direction::Long => candle.high > pos.extreme_price,
        Direction::Short => candle.low < pos.extreme_price,
    };
    if new_extreme {
        pos.extreme_price = match pos.direction {
            Direction::Long => candle.high,
            Direction::Short => candle.low,
        };
    }

    let engaged = match pos.direction {
        Direction::Long => pos.extreme_price >= pos.trail_start,
        Direction::Short => pos.extreme_price <= pos.trail_start,
    };
    if !engaged {
        return;
    }
    pos.state = LifecycleState::Trailing;

    let dist = pos.trail_dist * trail_multiplier(pos.direction, prev_rsi);
    let candidate = match pos.direction {
        Direction::Long => pos.extreme_price - dist,
        Direction::Short => pos.extreme_price + dist,
    };
    pos.tighten_stop(candidate);
}

/// Attempt a pullback add-on at the candle open. Fires only while the
/// add budget remains and the previous RSI shows a counter-move into
/// the position's direction.
pub fn try_addon(
    pos: &mut Position,
    candle: &Candle,
    entry_index: usize,
    prev_rsi: f64,
    params: &StrategyParams,
) -> bool {
    if pos.add_count >= params.max_adds || prev_rsi.is_nan() {
        return false;
    }
    let pullback = match pos.direction {
        Direction::Long => prev_rsi < PULLBACK_RSI_LONG,
        Direction::Short => prev_rsi > PULLBACK_RSI_SHORT,
    };
    if !pullback {
        return false;
    }
    pos.add_leg(candle.open, candle.ts, entry_index);
    true
}

/// Close every leg at `exit_price`, one Trade per leg. Round-trip cost
/// comes off the gross percentage first, leverage multiplies last.
pub fn close_all(
    pos: &Position,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    reason: ExitReason,
    params: &StrategyParams,
) -> Vec<Trade> {
    pos.legs
        .iter()
        .map(|leg| {
            let gross =
                (exit_price - leg.entry_price) / leg.entry_price * pos.direction.sign() * 100.0;
            let r_multiple = if leg.risk > 0.0 {
                (exit_price - leg.entry_price) * pos.direction.sign() / leg.risk
            } else {
                0.0
            };
            Trade {
                direction: pos.direction,
                pattern: pattern_of(pos.direction),
                entry_price: leg.entry_price,
                exit_price,
                entry_time: leg.entry_time,
                exit_time,
                exit_reason: reason,
                pnl_pct: (gross - params.round_trip_cost_pct) * params.leverage,
                r_multiple,
                is_addon: leg.is_addon,
            }
        })
        .collect()
}

fn pattern_of(direction: Direction) -> PatternKind {
    match direction {
        Direction::Long => PatternKind::W,
        Direction::Short => PatternKind::M,
    }
}
