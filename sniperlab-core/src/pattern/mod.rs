//! W/M reversal pattern detection.
//!
//! Two stages: `pivot` turns a candle series and its MACD histogram
//! into confirmed swing pivots; `detector` classifies pivot triples as
//! W (double bottom) or M (double top) within a tolerance band.

pub mod detector;
pub mod pivot;

pub use detector::{detect, detect_in_pivots, PatternMatch};
pub use pivot::{extract_pivots, Pivot, PivotKind};
