//! MACD (Moving Average Convergence Divergence).
//!
//! macd = EMA(fast) - EMA(slow); signal = EMA(signal_period) of macd;
//! histogram = macd - signal. The pattern detector consumes only the
//! histogram: its sign flips segment the series into the alternating
//! runs that pivot extraction is built on.

use super::ema::ema;

/// The three MACD series, each the same length as the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Standard 12/26/9 parameters.
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Full MACD computation over a close series.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal = ema(&macd, signal_period);

    let histogram: Vec<f64> = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}

/// MACD histogram with the standard 12/26/9 parameters.
pub fn macd_histogram(closes: &[f64]) -> Vec<f64> {
    macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL).histogram
}
