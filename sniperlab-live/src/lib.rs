//! Live multi-symbol orchestration on top of `sniperlab-core`.
//!
//! One worker thread owns all symbol state and consumes candle-close
//! commands over a channel. Venue access sits behind the `CandleFeed`
//! and `ExecutionAdapter` traits so tests run without a network.

pub mod capital;
pub mod execution;
pub mod feed;
pub mod notify;
pub mod orchestrator;
pub mod readiness;
pub mod state;

pub use capital::{CapitalError, CapitalLedger, RESERVE_FRACTION};
pub use execution::{ExecError, ExecutionAdapter, OrderIntent};
pub use feed::{CandleFeed, FeedError, SubscriptionRotation};
pub use notify::{LiveEvent, LogNotifier, Notifier};
pub use orchestrator::{spawn_orchestrator, Orchestrator, OrchestratorCommand, OrchestratorConfig};
pub use readiness::{readiness, ENTRY_THRESHOLD};
pub use state::{SymbolState, SymbolStatus, WATCH_THRESHOLD};
