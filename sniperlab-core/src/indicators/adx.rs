//! ADX (Average Directional Index, Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive candles
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period (period for DI smoothing, then period for ADX).

use crate::domain::Candle;
use crate::indicators::atr::{true_range, wilder_smooth};

/// ADX over a candle series. NaN through the 2×period warm-up.
pub fn adx(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let result = vec![f64::NAN; n];

    if n < 2 || period == 0 {
        return result;
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let c = &candles[i];
        let p = &candles[i - 1];
        if c.high.is_nan() || c.low.is_nan() || p.high.is_nan() || p.low.is_nan() {
            continue;
        }
        let high_diff = c.high - p.high;
        let low_diff = p.low - c.low;

        plus_dm[i] = if high_diff > low_diff && high_diff > 0.0 {
            high_diff
        } else {
            0.0
        };
        minus_dm[i] = if low_diff > high_diff && low_diff > 0.0 {
            low_diff
        } else {
            0.0
        };
    }

    let tr = true_range(candles);
    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus_dm = wilder_smooth(&plus_dm, period);
    let smooth_minus_dm = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan()
            || smooth_plus_dm[i].is_nan()
            || smooth_minus_dm[i].is_nan()
            || smooth_tr[i] == 0.0
        {
            continue;
        }

        let plus_di = 100.0 * smooth_plus_dm[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus_dm[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;

        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    wilder_smooth(&dx, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let base = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                ts: base + chrono::Duration::hours(2 * i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn trending_candles(n: usize) -> Vec<Candle> {
        make_ohlc(
            &(0..n)
                .map(|i| {
                    let base = 100.0 + 2.0 * i as f64;
                    (base, base + 3.0, base - 1.0, base + 2.0)
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn adx_warmup_is_nan() {
        let candles = trending_candles(20);
        let result = adx(&candles, 5);
        for v in &result[..10] {
            assert!(v.is_nan());
        }
    }

    #[test]
    fn strong_trend_has_high_adx() {
        let candles = trending_candles(40);
        let result = adx(&candles, 5);
        let last = *result.last().unwrap();
        assert!(last > 50.0, "expected strong-trend ADX, got {last}");
    }

    #[test]
    fn adx_bounds() {
        let candles = trending_candles(40);
        for v in adx(&candles, 5) {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn too_short_series_is_all_nan() {
        let candles = trending_candles(3);
        assert!(adx(&candles, 5).iter().all(|v| v.is_nan()));
    }
}
