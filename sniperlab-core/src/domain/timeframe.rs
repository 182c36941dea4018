//! Timeframe — candle bucket durations with a total duration ordering.
//!
//! The ordering matters: the trend-filter timeframe must be strictly
//! longer than the entry timeframe, and the fine-grid optimizer steps
//! timeframes by one ordinal position.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::params::ParamError;

/// Supported candle timeframes, shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    W1,
}

/// All timeframes in ascending duration order.
pub const ALL_TIMEFRAMES: [Timeframe; 10] = [
    Timeframe::M15,
    Timeframe::M30,
    Timeframe::H1,
    Timeframe::H2,
    Timeframe::H4,
    Timeframe::H6,
    Timeframe::H8,
    Timeframe::H12,
    Timeframe::D1,
    Timeframe::W1,
];

impl Timeframe {
    /// Bucket duration in minutes.
    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H8 => 480,
            Timeframe::H12 => 720,
            Timeframe::D1 => 1440,
            Timeframe::W1 => 10_080,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Ordinal index in `ALL_TIMEFRAMES`.
    pub fn ordinal(self) -> usize {
        ALL_TIMEFRAMES.iter().position(|&t| t == self).unwrap()
    }

    /// Neighbors within `steps` ordinal positions, self included.
    /// Used by the fine-grid stage of the optimizer.
    pub fn neighbors(self, steps: usize) -> Vec<Timeframe> {
        let idx = self.ordinal() as isize;
        let lo = (idx - steps as isize).max(0) as usize;
        let hi = ((idx + steps as isize) as usize).min(ALL_TIMEFRAMES.len() - 1);
        ALL_TIMEFRAMES[lo..=hi].to_vec()
    }
}

impl PartialOrd for Timeframe {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timeframe {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minutes().cmp(&other.minutes())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeframe {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "15m" | "15min" => Ok(Timeframe::M15),
            "30m" | "30min" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "2h" => Ok(Timeframe::H2),
            "4h" => Ok(Timeframe::H4),
            "6h" => Ok(Timeframe::H6),
            "8h" => Ok(Timeframe::H8),
            "12h" => Ok(Timeframe::H12),
            "1d" | "d" => Ok(Timeframe::D1),
            "1w" | "w" => Ok(Timeframe::W1),
            other => Err(ParamError::UnknownTimeframe(other.to_string())),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ParamError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> String {
        tf.to_string()
    }
}
