//! Multi-symbol orchestrator and its worker thread.
//!
//! One lifecycle per symbol, one shared capital pool. The worker
//! thread consumes commands over `mpsc`; a `Poll` command pumps every
//! active symbol's `CandleFeed` subscription, and a stop request flips
//! a flag that refuses new entries while in-flight exit checks keep
//! running until shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use sniperlab_core::domain::{Candle, Position, TradeSignal};
use sniperlab_core::{lifecycle, signal_engine, StrategyParams};

use crate::capital::CapitalLedger;
use crate::execution::{ExecutionAdapter, OrderIntent};
use crate::feed::{CandleFeed, SubscriptionRotation};
use crate::notify::{LiveEvent, Notifier};
use crate::readiness::{self, ENTRY_THRESHOLD};
use crate::state::{SymbolState, SymbolStatus};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub params: StrategyParams,
    pub entry_threshold: f64,
    /// Symbols whose initialization win rate sits below this floor are
    /// excluded before trading starts.
    pub min_win_rate: f64,
    /// Ceiling on simultaneously open positions across all symbols.
    pub max_positions: usize,
    /// Trailing candles kept per symbol.
    pub candle_window: usize,
    pub total_capital: f64,
    /// Live feed subscription budget per venue.
    pub subscription_budget: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            params: StrategyParams::default(),
            entry_threshold: ENTRY_THRESHOLD,
            min_win_rate: 60.0,
            max_positions: 5,
            candle_window: 600,
            total_capital: 10_000.0,
            subscription_budget: 10,
        }
    }
}

/// Commands consumed by the worker thread.
#[derive(Debug)]
pub enum OrchestratorCommand {
    CandleClosed { symbol: String, candle: Candle },
    /// Poll every active symbol's feed subscription once.
    Poll,
    FeedDown { symbol: String },
    FeedRecovered { symbol: String },
    Rotate,
    /// Refuse new entries; keep managing open positions.
    Stop,
    Shutdown,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    states: HashMap<String, SymbolState>,
    ledger: CapitalLedger,
    rotation: SubscriptionRotation,
    feed: Option<Box<dyn CandleFeed>>,
    execution: Box<dyn ExecutionAdapter>,
    notifier: Box<dyn Notifier>,
    stop_requested: bool,
}

impl Orchestrator {
    /// Build the symbol table, exclude weak symbols, allocate capital.
    pub fn new(
        win_rates: HashMap<String, f64>,
        volumes: HashMap<String, f64>,
        config: OrchestratorConfig,
        execution: Box<dyn ExecutionAdapter>,
        mut notifier: Box<dyn Notifier>,
    ) -> Self {
        let mut states = HashMap::new();
        let mut active_volumes = HashMap::new();
        let mut symbols: Vec<String> = win_rates.keys().cloned().collect();
        symbols.sort();

        for symbol in &symbols {
            let win_rate = win_rates[symbol];
            let mut state = SymbolState::new(symbol.clone());
            state.backtest_win_rate = win_rate;
            if win_rate < config.min_win_rate {
                state.exclude();
                notifier.notify(&LiveEvent::Excluded {
                    symbol: symbol.clone(),
                    win_rate,
                });
            } else {
                active_volumes
                    .insert(symbol.clone(), volumes.get(symbol).copied().unwrap_or(0.0));
            }
            states.insert(symbol.clone(), state);
        }

        let ledger = CapitalLedger::new(config.total_capital);
        ledger.allocate(&active_volumes);

        // Excluded symbols never occupy a subscription slot.
        let mut rotation = SubscriptionRotation::new(symbols.clone(), config.subscription_budget);
        for symbol in &symbols {
            if !active_volumes.contains_key(symbol) {
                rotation.remove(symbol);
            }
        }

        Self {
            config,
            states,
            ledger,
            rotation,
            feed: None,
            execution,
            notifier,
            stop_requested: false,
        }
    }

    /// Attach the candle feed polled by `poll_feeds`.
    pub fn with_feed(mut self, feed: Box<dyn CandleFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Poll each active subscription once. A poll error marks the
    /// symbol's feed unhealthy; any later successful poll recovers it.
    pub fn poll_feeds(&mut self) {
        let Some(mut feed) = self.feed.take() else {
            return;
        };
        let active: Vec<String> = self.rotation.active().map(str::to_string).collect();
        for symbol in active {
            match feed.poll(&symbol) {
                Ok(Some(candle)) => {
                    self.set_feed_health(&symbol, true);
                    self.on_candle_close(&symbol, candle);
                }
                Ok(None) => self.set_feed_health(&symbol, true),
                Err(err) => {
                    log::warn!("{symbol} feed poll failed: {err}");
                    self.set_feed_health(&symbol, false);
                }
            }
        }
        self.feed = Some(feed);
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
        log::info!("stop requested: new entries refused, open positions still managed");
    }

    pub fn rotate(&mut self) {
        self.rotation.rotate();
    }

    pub fn set_feed_health(&mut self, symbol: &str, healthy: bool) {
        if let Some(state) = self.states.get_mut(symbol) {
            if state.feed_healthy && !healthy {
                log::warn!("{symbol} feed down, skipping until recovery");
            }
            state.feed_healthy = healthy;
        }
    }

    pub fn status_of(&self, symbol: &str) -> Option<SymbolStatus> {
        self.states.get(symbol).map(|s| s.status)
    }

    fn open_position_count(&self) -> usize {
        self.states.values().filter(|s| s.position.is_some()).count()
    }

    /// One candle-close cycle for one symbol. A slow feed elsewhere
    /// never blocks this path; each symbol is fully independent apart
    /// from the capital ledger.
    pub fn on_candle_close(&mut self, symbol: &str, candle: Candle) {
        let Some(state) = self.states.get_mut(symbol) else {
            return;
        };
        if state.status == SymbolStatus::Excluded || !state.feed_healthy {
            return;
        }
        if !self.rotation.is_active(symbol) {
            return;
        }

        state.candles.push(candle.clone());
        let window = self.config.candle_window;
        if state.candles.len() > window {
            let excess = state.candles.len() - window;
            state.candles.drain(..excess);
        }

        if state.position.is_some() {
            self.manage_open_position(symbol, &candle);
            return;
        }

        // New entries stop here once a stop was requested.
        if self.stop_requested {
            return;
        }

        let Some(state) = self.states.get_mut(symbol) else {
            return;
        };
        let score = readiness::readiness(&state.candles, &self.config.params);
        state.apply_readiness(score, self.config.entry_threshold);

        if state.status != SymbolStatus::Ready {
            return;
        }
        let Some(signal) = signal_engine::detect_signal(&state.candles, &self.config.params)
        else {
            return;
        };
        self.attempt_entry(symbol, &signal, candle.ts);
    }

    /// Exit checks run to completion even after a stop request.
    fn manage_open_position(&mut self, symbol: &str, candle: &Candle) {
        let Some(state) = self.states.get_mut(symbol) else {
            return;
        };
        let Some(pos) = state.position.as_mut() else {
            return;
        };

        if let Some(trades) = lifecycle::check_exit(pos, candle, &self.config.params) {
            let intent = OrderIntent {
                symbol: symbol.to_string(),
                direction: pos.direction,
                size: self.ledger.in_use_of(symbol),
                stop_loss: pos.current_stop,
            };
            if let Err(err) = self.execution.submit_exit(&intent) {
                // Position stays open; the stop check repeats next candle.
                log::error!("{symbol} exit submission failed: {err}");
                return;
            }
            let pnl: f64 = trades.iter().map(|t| t.pnl_pct).sum();
            let exit_price = trades.first().map(|t| t.exit_price).unwrap_or(0.0);
            let reason = trades
                .first()
                .map(|t| t.exit_reason)
                .unwrap_or(sniperlab_core::domain::ExitReason::StopHit);
            self.ledger.release(symbol);
            if let Some(state) = self.states.get_mut(symbol) {
                state.clear_position();
            }
            self.notifier.notify(&LiveEvent::Exited {
                symbol: symbol.to_string(),
                exit_price,
                reason,
                pnl_pct: pnl,
            });
        } else {
            let prev_rsi = trailing_rsi(&state.candles);
            lifecycle::update_trailing(pos, candle, prev_rsi);
        }
    }

    /// Attempt to open a position from a detected signal, filled at
    /// `at` (the triggering candle's timestamp, not the pattern
    /// confirmation time). A failed submission leaves the symbol
    /// unopened; the next eligible signal retries.
    pub fn attempt_entry(&mut self, symbol: &str, signal: &TradeSignal, at: DateTime<Utc>) {
        if self.stop_requested || self.open_position_count() >= self.config.max_positions {
            return;
        }
        let size = self.ledger.budget_of(symbol);
        if size <= 0.0 {
            return;
        }
        if let Err(err) = self.ledger.reserve(symbol, size) {
            log::warn!("{symbol} entry skipped: {err}");
            return;
        }

        let intent = OrderIntent {
            symbol: symbol.to_string(),
            direction: signal.direction,
            size,
            stop_loss: signal.stop_loss,
        };
        if let Err(err) = self.execution.submit_entry(&intent) {
            // Must not assume a fill: release and retry on a later signal.
            self.ledger.release(symbol);
            log::warn!("{symbol} entry submission failed: {err}");
            return;
        }

        let position = Position::open(
            signal.direction,
            signal.entry_price,
            signal.stop_loss,
            at,
            signal.candle_index,
            self.config.params.trail_start_r,
            self.config.params.trail_dist_r,
        );
        let Some(state) = self.states.get_mut(symbol) else {
            self.ledger.release(symbol);
            return;
        };
        state.enter_position(position);
        self.notifier.notify(&LiveEvent::Entered {
            symbol: symbol.to_string(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
        });
    }
}

/// Previous-candle RSI for the trailing distance multiplier.
fn trailing_rsi(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return f64::NAN;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let series = sniperlab_core::indicators::rsi(&closes, lifecycle::RSI_PERIOD);
    series[series.len() - 2]
}

/// Spawn the orchestrator worker thread.
pub fn spawn_orchestrator(
    rx: Receiver<OrchestratorCommand>,
    mut orchestrator: Orchestrator,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("sniperlab-orchestrator".into())
        .spawn(move || loop {
            if stop_flag.load(Ordering::Relaxed) {
                orchestrator.request_stop();
            }
            match rx.recv() {
                Ok(OrchestratorCommand::CandleClosed { symbol, candle }) => {
                    orchestrator.on_candle_close(&symbol, candle);
                }
                Ok(OrchestratorCommand::FeedDown { symbol }) => {
                    orchestrator.set_feed_health(&symbol, false);
                }
                Ok(OrchestratorCommand::FeedRecovered { symbol }) => {
                    orchestrator.set_feed_health(&symbol, true);
                }
                Ok(OrchestratorCommand::Poll) => orchestrator.poll_feeds(),
                Ok(OrchestratorCommand::Rotate) => orchestrator.rotate(),
                Ok(OrchestratorCommand::Stop) => orchestrator.request_stop(),
                Ok(OrchestratorCommand::Shutdown) | Err(_) => break,
            }
        })
        .expect("failed to spawn orchestrator thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sniperlab_core::domain::{Direction, PatternKind};
    use std::sync::{Arc as StdArc, Mutex};

    #[derive(Default)]
    struct RecordingExec {
        fail_entries: bool,
        entries: StdArc<Mutex<Vec<OrderIntent>>>,
        exits: StdArc<Mutex<Vec<OrderIntent>>>,
    }

    impl ExecutionAdapter for RecordingExec {
        fn submit_entry(&mut self, intent: &OrderIntent) -> Result<(), crate::execution::ExecError> {
            if self.fail_entries {
                return Err(crate::execution::ExecError::Unreachable("venue down".into()));
            }
            self.entries.lock().unwrap().push(intent.clone());
            Ok(())
        }
        fn submit_exit(&mut self, intent: &OrderIntent) -> Result<(), crate::execution::ExecError> {
            self.exits.lock().unwrap().push(intent.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: StdArc<Mutex<Vec<LiveEvent>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&mut self, event: &LiveEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn ts(minute: u32) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc
            .with_ymd_and_hms(2025, 6, 1, minute / 60, minute % 60, 0)
            .unwrap()
    }

    fn candle(minute: u32, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            ts: ts(minute),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn signal() -> TradeSignal {
        TradeSignal {
            direction: Direction::Long,
            pattern: PatternKind::W,
            entry_price: 100.0,
            stop_loss: 95.0,
            atr: 4.0,
            candle_index: 10,
            detected_at: ts(0),
            valid_until: ts(0) + chrono::Duration::hours(12),
        }
    }

    fn build(
        win_rates: &[(&str, f64)],
        fail_entries: bool,
    ) -> (
        Orchestrator,
        StdArc<Mutex<Vec<OrderIntent>>>,
        StdArc<Mutex<Vec<LiveEvent>>>,
    ) {
        let exec = RecordingExec {
            fail_entries,
            ..RecordingExec::default()
        };
        let entries = StdArc::clone(&exec.entries);
        let notifier = RecordingNotifier::default();
        let events = StdArc::clone(&notifier.events);
        let rates: HashMap<String, f64> =
            win_rates.iter().map(|(s, w)| (s.to_string(), *w)).collect();
        let volumes: HashMap<String, f64> =
            win_rates.iter().map(|(s, _)| (s.to_string(), 1.0)).collect();
        let orch = Orchestrator::new(
            rates,
            volumes,
            OrchestratorConfig::default(),
            Box::new(exec),
            Box::new(notifier),
        );
        (orch, entries, events)
    }

    #[test]
    fn weak_win_rate_is_excluded_forever() {
        let (mut orch, entries, events) = build(&[("WEAK", 55.0), ("GOOD", 72.0)], false);
        assert_eq!(orch.status_of("WEAK"), Some(SymbolStatus::Excluded));
        assert_eq!(orch.status_of("GOOD"), Some(SymbolStatus::Wait));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, LiveEvent::Excluded { symbol, .. } if symbol == "WEAK")));

        // Even a perfect signal cannot open a position on an excluded
        // symbol: it holds no capital budget.
        orch.attempt_entry("WEAK", &signal(), ts(15));
        assert_eq!(orch.status_of("WEAK"), Some(SymbolStatus::Excluded));
        assert!(entries.lock().unwrap().is_empty());
    }

    #[test]
    fn entry_flow_reserves_capital_and_notifies() {
        let (mut orch, entries, events) = build(&[("BTC", 70.0)], false);
        orch.attempt_entry("BTC", &signal(), ts(15));
        assert_eq!(orch.status_of("BTC"), Some(SymbolStatus::InPosition));
        assert_eq!(entries.lock().unwrap().len(), 1);
        assert!(orch.ledger.in_use_of("BTC") > 0.0);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, LiveEvent::Entered { .. })));
    }

    #[test]
    fn failed_execution_leaves_symbol_unopened() {
        let (mut orch, entries, _events) = build(&[("BTC", 70.0)], true);
        orch.attempt_entry("BTC", &signal(), ts(15));
        assert_eq!(orch.status_of("BTC"), Some(SymbolStatus::Wait));
        assert!(entries.lock().unwrap().is_empty());
        // Reservation was rolled back; a retry can succeed later.
        assert_eq!(orch.ledger.in_use_of("BTC"), 0.0);
    }

    #[test]
    fn stop_refuses_entries_but_completes_exits() {
        let (mut orch, _entries, events) = build(&[("BTC", 70.0), ("ETH", 70.0)], false);
        orch.attempt_entry("BTC", &signal(), ts(0));
        orch.request_stop();

        // ETH cannot enter any more.
        orch.attempt_entry("ETH", &signal(), ts(0));
        assert_eq!(orch.status_of("ETH"), Some(SymbolStatus::Wait));

        // BTC's open position still gets its exit check and closes on a
        // stop-crossing candle.
        orch.on_candle_close("BTC", candle(15, 96.0, 96.5, 94.0, 94.5));
        assert_eq!(orch.status_of("BTC"), Some(SymbolStatus::Wait));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, LiveEvent::Exited { .. })));
        assert_eq!(orch.ledger.in_use_of("BTC"), 0.0);
    }

    #[test]
    fn unhealthy_feed_skips_symbol_only() {
        let (mut orch, _entries, _events) = build(&[("BTC", 70.0), ("ETH", 70.0)], false);
        orch.set_feed_health("BTC", false);
        orch.on_candle_close("BTC", candle(15, 100.0, 101.0, 99.0, 100.5));
        assert!(orch
            .states
            .get("BTC")
            .map(|s| s.candles.is_empty())
            .unwrap());

        orch.on_candle_close("ETH", candle(15, 100.0, 101.0, 99.0, 100.5));
        assert_eq!(orch.states.get("ETH").unwrap().candles.len(), 1);

        orch.set_feed_health("BTC", true);
        orch.on_candle_close("BTC", candle(30, 100.0, 101.0, 99.0, 100.5));
        assert_eq!(orch.states.get("BTC").unwrap().candles.len(), 1);
    }

    #[test]
    fn position_ceiling_blocks_new_entries() {
        let (mut orch, _entries, _events) = build(&[("A", 70.0), ("B", 70.0)], false);
        orch.config.max_positions = 1;
        orch.attempt_entry("A", &signal(), ts(0));
        orch.attempt_entry("B", &signal(), ts(0));
        assert_eq!(orch.status_of("A"), Some(SymbolStatus::InPosition));
        assert_eq!(orch.status_of("B"), Some(SymbolStatus::Wait));
    }

    #[derive(Default)]
    struct ScriptedFeed {
        queues: StdArc<Mutex<HashMap<String, std::collections::VecDeque<Candle>>>>,
        failing: StdArc<Mutex<std::collections::HashSet<String>>>,
        polled: StdArc<Mutex<Vec<String>>>,
    }

    impl CandleFeed for ScriptedFeed {
        fn poll(&mut self, symbol: &str) -> Result<Option<Candle>, crate::feed::FeedError> {
            self.polled.lock().unwrap().push(symbol.to_string());
            if self.failing.lock().unwrap().contains(symbol) {
                return Err(crate::feed::FeedError::Unavailable(symbol.to_string()));
            }
            Ok(self
                .queues
                .lock()
                .unwrap()
                .get_mut(symbol)
                .and_then(|q| q.pop_front()))
        }
    }

    #[test]
    fn poll_pumps_active_feeds_and_never_asks_for_excluded() {
        let (orch, _entries, _events) = build(&[("WEAK", 55.0), ("GOOD", 72.0)], false);
        let feed = ScriptedFeed::default();
        let queues = StdArc::clone(&feed.queues);
        let polled = StdArc::clone(&feed.polled);
        queues.lock().unwrap().insert(
            "GOOD".into(),
            [candle(15, 100.0, 101.0, 99.0, 100.5)].into_iter().collect(),
        );
        queues.lock().unwrap().insert(
            "WEAK".into(),
            [candle(15, 100.0, 101.0, 99.0, 100.5)].into_iter().collect(),
        );

        let mut orch = orch.with_feed(Box::new(feed));
        orch.poll_feeds();

        assert_eq!(orch.states.get("GOOD").unwrap().candles.len(), 1);
        assert!(orch.states.get("WEAK").unwrap().candles.is_empty());
        let polled = polled.lock().unwrap();
        assert!(polled.iter().any(|s| s == "GOOD"));
        assert!(!polled.iter().any(|s| s == "WEAK"));
    }

    #[test]
    fn feed_poll_error_marks_unhealthy_until_a_later_poll_succeeds() {
        let (orch, _entries, _events) = build(&[("BTC", 70.0), ("ETH", 70.0)], false);
        let feed = ScriptedFeed::default();
        let queues = StdArc::clone(&feed.queues);
        let failing = StdArc::clone(&feed.failing);
        failing.lock().unwrap().insert("BTC".into());
        queues.lock().unwrap().insert(
            "ETH".into(),
            [candle(15, 100.0, 101.0, 99.0, 100.5)].into_iter().collect(),
        );

        let mut orch = orch.with_feed(Box::new(feed));
        orch.poll_feeds();
        // BTC down, ETH unaffected.
        assert!(!orch.states.get("BTC").unwrap().feed_healthy);
        assert_eq!(orch.states.get("ETH").unwrap().candles.len(), 1);

        failing.lock().unwrap().clear();
        queues.lock().unwrap().insert(
            "BTC".into(),
            [candle(30, 100.0, 101.0, 99.0, 100.5)].into_iter().collect(),
        );
        orch.poll_feeds();
        assert!(orch.states.get("BTC").unwrap().feed_healthy);
        assert_eq!(orch.states.get("BTC").unwrap().candles.len(), 1);
    }

    #[test]
    fn position_opens_at_fill_time_not_detection_time() {
        let (mut orch, _entries, _events) = build(&[("BTC", 70.0)], false);
        let sig = signal(); // detected_at = ts(0)
        orch.attempt_entry("BTC", &sig, ts(45));
        let pos = orch.states.get("BTC").unwrap().position.as_ref().unwrap();
        assert_eq!(pos.opened_at, ts(45));
        assert_ne!(pos.opened_at, sig.detected_at);
    }

    #[test]
    fn worker_thread_stops_on_shutdown() {
        let (orch, _entries, _events) = build(&[("BTC", 70.0)], false);
        let (tx, rx) = std::sync::mpsc::channel();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let handle = spawn_orchestrator(rx, orch, Arc::clone(&stop_flag));
        tx.send(OrchestratorCommand::CandleClosed {
            symbol: "BTC".into(),
            candle: candle(15, 100.0, 101.0, 99.0, 100.5),
        })
        .unwrap();
        tx.send(OrchestratorCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
