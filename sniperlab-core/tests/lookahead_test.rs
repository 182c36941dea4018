//! Look-ahead contamination tests.
//!
//! Invariant: no value computed for candle t may depend on data from
//! candle t+1 or later.
//!
//! Method: compute on a truncated series and on the full series, then
//! assert the overlapping prefix is identical. Any difference means
//! future data leaked into past values.

use chrono::TimeZone;
use sniperlab_core::domain::Candle;
use sniperlab_core::indicators::{adx, atr, ema, macd_histogram, rsi};
use sniperlab_core::signal_engine::extract_intents;
use sniperlab_core::{engine, StrategyParams};

/// Generate N 15-minute candles of synthetic OHLCV with realistic variation.
fn make_test_candles(n: usize) -> Vec<Candle> {
    let base = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let mut candles = Vec::with_capacity(n);
    let mut price = 100.0f64;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.02; // -2.0 to +2.0
        price = (price + change).max(10.0);

        let open = price - 0.2;
        let close = price + 0.1;
        candles.push(Candle {
            ts: base + chrono::Duration::minutes(15 * i as i64),
            open,
            high: open.max(close) + 0.8,
            low: open.min(close) - 0.8,
            close,
            volume: 1000.0 + (i as f64) * 10.0,
        });
    }

    candles
}

fn assert_prefix_equal(truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        let same = (t.is_nan() && f.is_nan()) || t == f;
        assert!(same, "divergence at index {i}: truncated={t}, full={f}");
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let full = make_test_candles(400);
    let truncated = &full[..200];

    let closes_full: Vec<f64> = full.iter().map(|c| c.close).collect();
    let closes_trunc: Vec<f64> = truncated.iter().map(|c| c.close).collect();

    assert_prefix_equal(&rsi(&closes_trunc, 14), &rsi(&closes_full, 14)[..200]);
    assert_prefix_equal(&ema(&closes_trunc, 20), &ema(&closes_full, 20)[..200]);
    assert_prefix_equal(
        &macd_histogram(&closes_trunc),
        &macd_histogram(&closes_full)[..200],
    );
    assert_prefix_equal(&atr(truncated, 14), &atr(&full, 14)[..200]);
    assert_prefix_equal(&adx(truncated, 14), &adx(&full, 14)[..200]);
}

#[test]
fn intents_available_in_prefix_are_identical() {
    let full = make_test_candles(4000);
    let cut = 3000;
    let params = StrategyParams::default();

    let prefix_intents = extract_intents(&full[..cut], &params);
    let full_intents = extract_intents(&full, &params);

    // Everything actionable inside the prefix must exist identically in
    // both runs; the full series may only append later intents.
    let prefix_end = full[cut - 1].ts + params.entry_tf.duration();
    let visible: Vec<_> = full_intents
        .iter()
        .filter(|i| i.available_at <= prefix_end)
        .collect();
    let prefix_visible: Vec<_> = prefix_intents
        .iter()
        .filter(|i| i.available_at <= prefix_end)
        .collect();

    assert_eq!(prefix_visible.len(), visible.len());
    for (a, b) in prefix_visible.iter().zip(visible) {
        assert_eq!(*a, b);
    }
}

#[test]
fn backtest_prefix_replay_is_identical() {
    let full_series = make_test_candles(4000);
    let params = StrategyParams::default();
    let cut = 3000;

    let full = engine::run(&full_series, &params).unwrap();
    let prefix = engine::run(&full_series[..cut], &params).unwrap();

    let cutoff = full_series[cut - 1].ts;
    let full_before: Vec<_> = full
        .trades
        .iter()
        .filter(|t| t.exit_time <= cutoff)
        .collect();

    assert_eq!(prefix.trades.len(), full_before.len());
    for (a, b) in prefix.trades.iter().zip(full_before) {
        assert_eq!(a, b);
    }
}
