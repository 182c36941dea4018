//! Signal engine: trend-filtered W/M entries with ATR stops.
//!
//! All refusals here are `None`, never errors. Insufficient history,
//! an absent pattern, a stale pattern, a disagreeing trend filter and
//! a non-positive ATR all mean the same thing to the caller: no signal
//! this candle.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, PatternKind, Timeframe, TradeSignal};
use crate::indicators::{adx, atr, ema};
use crate::params::StrategyParams;
use crate::pattern;

/// ATR period for stop distances.
pub const ATR_PERIOD: usize = 14;
/// EMA period for the higher-timeframe trend filter.
pub const TREND_EMA_PERIOD: usize = 20;
/// ADX period when the trend-strength filter is enabled.
pub const ADX_PERIOD: usize = 14;
/// Minimum filter-timeframe candles before the MACD runs mean anything.
const MIN_FILTER_CANDLES: usize = 35;

/// Directional bias of the trend-filter timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

/// Resample entry-timeframe candles into fully-closed buckets of a
/// longer timeframe. Buckets align to the epoch; the final bucket is
/// dropped unless the entry series extends to its close, so a caller
/// can never see a partially-formed higher-timeframe candle.
pub fn resample(candles: &[Candle], entry_tf: Timeframe, target_tf: Timeframe) -> Vec<Candle> {
    let dur = target_tf.minutes() * 60;
    let entry_dur = entry_tf.minutes() * 60;
    let mut out: Vec<Candle> = Vec::new();

    for c in candles {
        let bucket = c.ts.timestamp().div_euclid(dur) * dur;
        let bucket_ts = DateTime::<Utc>::from_timestamp(bucket, 0).unwrap_or(c.ts);
        match out.last_mut() {
            Some(last) if last.ts == bucket_ts => {
                last.high = last.high.max(c.high);
                last.low = last.low.min(c.low);
                last.close = c.close;
                last.volume += c.volume;
            }
            _ => out.push(Candle {
                ts: bucket_ts,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            }),
        }
    }

    // Drop the trailing bucket if it has not closed yet.
    if let (Some(last_bucket), Some(last_entry)) = (out.last(), candles.last()) {
        let now = last_entry.ts.timestamp() + entry_dur;
        if last_bucket.ts.timestamp() + dur > now {
            out.pop();
        }
    }

    out
}

/// Close-versus-EMA trend read on an already-resampled filter series.
pub fn filter_trend(filter_candles: &[Candle]) -> Option<Trend> {
    if filter_candles.len() < TREND_EMA_PERIOD {
        return None;
    }
    let closes: Vec<f64> = filter_candles.iter().map(|c| c.close).collect();
    let trend_ema = ema(&closes, TREND_EMA_PERIOD);
    let last_ema = *trend_ema.last()?;
    let last_close = *closes.last()?;
    if last_ema.is_nan() || last_close.is_nan() {
        return None;
    }
    Some(if last_close > last_ema {
        Trend::Up
    } else {
        Trend::Down
    })
}

/// Detect a trade signal as of the last candle of `entry_series`.
///
/// The entry series must be strictly time-ordered; `params` must have
/// been validated. Decision time is the close of the last entry candle.
pub fn detect_signal(entry_series: &[Candle], params: &StrategyParams) -> Option<TradeSignal> {
    let last = entry_series.last()?;
    let now = last.ts + params.entry_tf.duration();

    let filter = resample(entry_series, params.entry_tf, params.filter_tf);
    if filter.len() < MIN_FILTER_CANDLES {
        return None;
    }

    if params.adx_floor > 0.0 {
        let adx_series = adx(&filter, ADX_PERIOD);
        let last_adx = *adx_series.last()?;
        if last_adx.is_nan() || last_adx < params.adx_floor {
            return None;
        }
    }

    let m = pattern::detect(&filter, params.pattern_tolerance, params.min_confidence)?;

    // A pattern confirmed too long ago is stale, not tradeable.
    let age = now - m.confirmed_at;
    if age > params.validity() {
        return None;
    }

    // The trend filter and the pattern must agree; on disagreement or
    // an unreadable trend, fail closed.
    let trend = filter_trend(&filter)?;
    match (m.kind, trend) {
        (PatternKind::W, Trend::Up) | (PatternKind::M, Trend::Down) => {}
        _ => return None,
    }

    let atr_series = atr(entry_series, ATR_PERIOD);
    let last_atr = *atr_series.last()?;
    if last_atr.is_nan() || last_atr <= 0.0 {
        return None;
    }

    let entry_price = last.close;
    let direction = m.kind.direction();
    let stop_loss = entry_price - direction.sign() * params.atr_mult * last_atr;

    Some(TradeSignal {
        direction,
        pattern: m.kind,
        entry_price,
        stop_loss,
        atr: last_atr,
        candle_index: entry_series.len() - 1,
        detected_at: m.confirmed_at,
        valid_until: m.confirmed_at + params.validity(),
    })
}

/// A pattern occurrence destined for the backtest pending queue.
///
/// `available_at` is when the confirming filter candle has fully
/// closed; the simulator may not act on the intent before then.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalIntent {
    pub kind: PatternKind,
    pub confidence: f64,
    pub confirmed_at: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
}

/// Extract every W/M occurrence in chronological order.
///
/// Unlike `detect_signal`, which answers "is there a tradeable pattern
/// right now", this walks the whole series once so the simulator can
/// stream intents into its pending queue as their filter candles close.
pub fn extract_intents(entry_series: &[Candle], params: &StrategyParams) -> Vec<SignalIntent> {
    let filter = resample(entry_series, params.entry_tf, params.filter_tf);
    if filter.len() < MIN_FILTER_CANDLES {
        return Vec::new();
    }
    let closes: Vec<f64> = filter.iter().map(|c| c.close).collect();
    let hist = crate::indicators::macd_histogram(&closes);
    let pivots = pattern::extract_pivots(&filter, &hist);

    let mut intents = Vec::new();
    if pivots.len() < 3 {
        return intents;
    }
    for window in pivots.windows(3) {
        if let Some(m) = pattern::detect_in_pivots(window, params.pattern_tolerance, params.min_confidence) {
            intents.push(SignalIntent {
                kind: m.kind,
                confidence: m.confidence,
                confirmed_at: m.confirmed_at,
                available_at: m.confirmed_at + params.filter_tf.duration(),
            });
        }
    }
    intents
}
