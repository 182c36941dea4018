//! Core domain types shared across the workspace.

pub mod candle;
pub mod position;
pub mod signal;
pub mod timeframe;
pub mod trade;

pub use candle::{is_strictly_ordered, Candle};
pub use position::{LifecycleState, Position, PositionLeg};
pub use signal::{Direction, ExitReason, PatternKind, TradeSignal};
pub use timeframe::{Timeframe, ALL_TIMEFRAMES};
pub use trade::Trade;
