//! Pure indicator functions over candle slices.
//!
//! Every function returns a Vec the same length as its input, with NaN
//! for positions inside the warm-up window. Callers treat NaN as
//! "insufficient data" and refuse to act on it; no function here ever
//! errors.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use adx::adx;
pub use atr::{atr, true_range, wilder_smooth};
pub use ema::ema;
pub use macd::{macd_histogram, MacdSeries};
pub use rsi::rsi;

/// Create synthetic candles from close prices for testing.
///
/// Generates plausible OHLV on a 15-minute grid: open = prev_close
/// (or close for the first candle), high/low pad the body by 1.0.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                ts: base + chrono::Duration::minutes(15 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
