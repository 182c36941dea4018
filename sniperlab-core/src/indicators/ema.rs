//! Exponential Moving Average.
//!
//! Recursive form, alpha = 2/(period+1), seeded with the first value.
//! No warm-up NaN prefix: EMA[0] = value[0], which matches the trend
//! filter's expectation that short filter series still produce a level.

/// EMA over a value series. NaN input poisons the rest of the series.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n == 0 || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = f64::NAN;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return result;
        }
        prev = if prev.is_nan() {
            v
        } else {
            alpha * v + (1.0 - alpha) * prev
        };
        result[i] = prev;
    }

    result
}
