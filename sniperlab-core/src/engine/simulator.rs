//! Chronological backtest over an entry-timeframe candle series.
//!
//! Single pass, single open position, exits before entries. At candle
//! i the simulator sees only series data up to i, and all indicator
//! reads come from candle i-1. Nothing here is parallel; determinism
//! per (series, params) pair is the whole point.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::domain::{Candle, Direction, Position, Trade};
use crate::lifecycle::{self, RSI_PERIOD};
use crate::params::{CapitalMode, ParamError, StrategyParams};
use crate::indicators;
use crate::signal_engine::{self, SignalIntent, ATR_PERIOD, TREND_EMA_PERIOD};

/// Outcome of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimResult {
    /// Closed trades in strict exit-time order, one per leg.
    pub trades: Vec<Trade>,
    /// Equity after each trade, starting from 100.0.
    pub equity_curve: Vec<f64>,
}

impl SimResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(100.0)
    }
}

struct PendingOrder {
    intent: SignalIntent,
    expires_at: DateTime<Utc>,
}

/// Run a full backtest. Parameters are validated before anything else;
/// an invalid combination never produces a partial ledger.
pub fn run(entry_series: &[Candle], params: &StrategyParams) -> Result<SimResult, ParamError> {
    params.validate()?;

    let n = entry_series.len();
    let mut trades: Vec<Trade> = Vec::new();

    if n < 2 {
        return Ok(build_result(trades, params));
    }

    let closes: Vec<f64> = entry_series.iter().map(|c| c.close).collect();
    let rsis = indicators::rsi(&closes, RSI_PERIOD);
    let atrs = indicators::atr(entry_series, ATR_PERIOD);

    // Trend filter on the resampled filter series, the same close vs
    // EMA read `detect_signal` makes. Bucket j becomes usable once it
    // has fully closed; the EMA is prefix-stable so precomputing over
    // the whole series leaks nothing.
    let filter = signal_engine::resample(entry_series, params.entry_tf, params.filter_tf);
    let filter_closes: Vec<f64> = filter.iter().map(|c| c.close).collect();
    let filter_ema = indicators::ema(&filter_closes, TREND_EMA_PERIOD);
    let filter_dur = params.filter_tf.duration();
    let mut closed_buckets = 0usize;

    let intents = signal_engine::extract_intents(entry_series, params);
    let mut next_intent = 0usize;
    let mut pending: VecDeque<PendingOrder> = VecDeque::new();
    let mut position: Option<Position> = None;

    for i in 1..n {
        let candle = &entry_series[i];
        let t = candle.ts;
        let prev_rsi = rsis[i - 1];
        let prev_atr = atrs[i - 1];

        while closed_buckets < filter.len() && filter[closed_buckets].ts + filter_dur <= t {
            closed_buckets += 1;
        }
        let prev_trend_up = if closed_buckets >= TREND_EMA_PERIOD {
            let j = closed_buckets - 1;
            Some(filter_closes[j] > filter_ema[j])
        } else {
            None
        };

        // Stream newly-available intents into the pending queue.
        while next_intent < intents.len() && intents[next_intent].available_at <= t {
            let intent = intents[next_intent].clone();
            let expires_at = intent.confirmed_at + params.validity();
            pending.push_back(PendingOrder { intent, expires_at });
            next_intent += 1;
        }
        while pending.front().map_or(false, |o| o.expires_at <= t) {
            pending.pop_front();
        }

        // 1. Exits before entries, always.
        if let Some(mut pos) = position.take() {
            if let Some(closed) = lifecycle::check_exit(&pos, candle, params) {
                trades.extend(closed);
            } else {
                lifecycle::update_trailing(&mut pos, candle, prev_rsi);
                lifecycle::try_addon(&mut pos, candle, i, prev_rsi, params);
                position = Some(pos);
            }
            continue;
        }

        // 2. Entry only with no open position and a live pending order.
        let Some(order) = pending.front() else {
            continue;
        };
        let direction = order.intent.kind.direction();
        // An unreadable trend (warmup) fails closed, like detect_signal.
        let trend_agrees = match (direction, prev_trend_up) {
            (Direction::Long, Some(up)) => up,
            (Direction::Short, Some(up)) => !up,
            (_, None) => false,
        };
        if !trend_agrees || prev_atr.is_nan() || prev_atr <= 0.0 {
            continue;
        }

        let entry_price = candle.open;
        let stop_loss = entry_price - direction.sign() * params.atr_mult * prev_atr;
        let pos = Position::open(
            direction,
            entry_price,
            stop_loss,
            t,
            i,
            params.trail_start_r,
            params.trail_dist_r,
        );

        // Same-candle stop: the entry candle itself can take the
        // position out. Conservative fill at the stop level.
        if pos.stop_crossed(candle.high, candle.low) {
            trades.extend(lifecycle::close_all(
                &pos,
                pos.current_stop,
                t,
                crate::domain::ExitReason::StopHit,
                params,
            ));
        } else {
            position = Some(pos);
        }
        pending.clear();
    }

    Ok(build_result(trades, params))
}

fn build_result(trades: Vec<Trade>, params: &StrategyParams) -> SimResult {
    let mut equity = 100.0;
    let mut curve = Vec::with_capacity(trades.len());
    for trade in &trades {
        match params.capital_mode {
            CapitalMode::Compound => equity *= 1.0 + trade.pnl_pct / 100.0,
            CapitalMode::Fixed => equity += trade.pnl_pct,
        }
        curve.push(equity);
    }
    SimResult {
        trades,
        equity_curve: curve,
    }
}
