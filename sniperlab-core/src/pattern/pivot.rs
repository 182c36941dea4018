//! Swing pivot extraction from MACD histogram sign segments.
//!
//! The histogram partitions a series into alternating positive and
//! negative runs. Each completed positive run contributes one H pivot
//! (the run's highest high); each completed negative run one L pivot
//! (the run's lowest low). A run still open at the end of the series
//! contributes nothing: its extreme is not yet known, and acting on it
//! would be lookahead.

use chrono::{DateTime, Utc};

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

/// One confirmed swing pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub kind: PivotKind,
    /// High of the candle for H pivots, low for L pivots.
    pub price: f64,
    /// Timestamp of the extreme candle itself.
    pub time: DateTime<Utc>,
    /// Open time of the sign-flip candle that ended the run. The pivot
    /// exists only once that candle has closed; nothing upstream may
    /// act on it earlier.
    pub confirmed_at: DateTime<Utc>,
}

/// Extract confirmed pivots from a candle series and its histogram.
/// `candles` and `histogram` must be the same length.
pub fn extract_pivots(candles: &[Candle], histogram: &[f64]) -> Vec<Pivot> {
    debug_assert_eq!(candles.len(), histogram.len());
    let n = candles.len();
    let mut pivots = Vec::new();
    let mut i = 0;

    while i < n {
        let h = histogram[i];
        if h > 0.0 {
            let start = i;
            while i < n && histogram[i] > 0.0 {
                i += 1;
            }
            // i == n means the run is still open; skip it.
            if i < n {
                if let Some(p) = segment_high(&candles[start..i]) {
                    pivots.push(Pivot {
                        kind: PivotKind::High,
                        price: p.high,
                        time: p.ts,
                        confirmed_at: candles[i].ts,
                    });
                }
            }
        } else if h < 0.0 {
            let start = i;
            while i < n && histogram[i] < 0.0 {
                i += 1;
            }
            if i < n {
                if let Some(p) = segment_low(&candles[start..i]) {
                    pivots.push(Pivot {
                        kind: PivotKind::Low,
                        price: p.low,
                        time: p.ts,
                        confirmed_at: candles[i].ts,
                    });
                }
            }
        } else {
            // Zero or NaN histogram breaks a run without starting one.
            i += 1;
        }
    }

    pivots
}

fn segment_high(candles: &[Candle]) -> Option<&Candle> {
    candles
        .iter()
        .filter(|c| !c.high.is_nan())
        .max_by(|a, b| a.high.partial_cmp(&b.high).unwrap())
}

fn segment_low(candles: &[Candle]) -> Option<&Candle> {
    candles
        .iter()
        .filter(|c| !c.low.is_nan())
        .min_by(|a, b| a.low.partial_cmp(&b.low).unwrap())
}
