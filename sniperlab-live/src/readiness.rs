//! Weighted entry-readiness scoring.
//!
//! readiness = 0.4×pattern + 0.3×ATR fit + 0.2×volume surge + 0.1×trend,
//! every sub-score normalized to 0..100. The orchestrator compares the
//! blend against the entry threshold each candle close.

use sniperlab_core::domain::Candle;
use sniperlab_core::signal_engine;
use sniperlab_core::StrategyParams;

/// Default readiness required to attempt an entry.
pub const ENTRY_THRESHOLD: f64 = 90.0;

/// Pattern confidence on the trend-filter view, 0 when nothing is
/// detected or history is too short.
pub fn pattern_score(candles: &[Candle], params: &StrategyParams) -> f64 {
    let filter = signal_engine::resample(candles, params.entry_tf, params.filter_tf);
    match sniperlab_core::pattern::detect(&filter, params.pattern_tolerance, 0.0) {
        Some(m) => m.confidence.clamp(0.0, 100.0),
        None => 0.0,
    }
}

/// How well the candle's range fills the configured ATR stop distance.
/// Full marks start at twice the target range.
pub fn atr_fit_score(candle: &Candle, atr_mult: f64) -> f64 {
    if candle.close <= 0.0 {
        return 0.0;
    }
    let range_pct = (candle.high - candle.low) / candle.close * 100.0;
    let target = atr_mult * 0.5;
    if target <= 0.0 {
        return 0.0;
    }
    if range_pct >= target {
        (range_pct / target * 50.0 + 50.0).min(100.0)
    } else {
        range_pct / target * 50.0
    }
}

/// Current volume against the trailing average. Neutral 50 without
/// enough history.
pub fn volume_surge_score(history: &[Candle]) -> f64 {
    let Some((current, rest)) = history.split_last() else {
        return 50.0;
    };
    if rest.len() < 5 {
        return 50.0;
    }
    let avg = rest.iter().map(|c| c.volume).sum::<f64>() / rest.len() as f64;
    if avg <= 0.0 {
        return 50.0;
    }
    let ratio = current.volume / avg;
    if ratio >= 3.0 {
        100.0
    } else if ratio >= 2.0 {
        80.0
    } else if ratio >= 1.5 {
        60.0
    } else {
        40.0
    }
}

/// Directional strength of the candle body.
pub fn trend_score(candle: &Candle) -> f64 {
    if candle.open <= 0.0 {
        return 50.0;
    }
    let change_pct = ((candle.close - candle.open) / candle.open * 100.0).abs();
    if change_pct > 2.0 {
        100.0
    } else if change_pct > 1.0 {
        80.0
    } else if change_pct > 0.5 {
        60.0
    } else {
        40.0
    }
}

/// The weighted blend. `candles` is the symbol's trailing entry-series
/// window with the just-closed candle last.
pub fn readiness(candles: &[Candle], params: &StrategyParams) -> f64 {
    let Some(last) = candles.last() else {
        return 0.0;
    };
    let score = pattern_score(candles, params) * 0.4
        + atr_fit_score(last, params.atr_mult) * 0.3
        + volume_surge_score(candles) * 0.2
        + trend_score(last) * 0.1;
    score.clamp(0.0, 100.0)
}
