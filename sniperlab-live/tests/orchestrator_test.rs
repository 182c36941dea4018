//! End-to-end orchestrator plumbing: initialization exclusion from a
//! measured win rate, and the command-channel worker thread.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use chrono::TimeZone;
use sniperlab_core::domain::{Candle, Direction, ExitReason, PatternKind, Trade};
use sniperlab_live::{
    spawn_orchestrator, ExecError, ExecutionAdapter, LiveEvent, Notifier, Orchestrator,
    OrchestratorCommand, OrchestratorConfig, OrderIntent, SymbolStatus,
};

#[derive(Default)]
struct NoopExec;

impl ExecutionAdapter for NoopExec {
    fn submit_entry(&mut self, _intent: &OrderIntent) -> Result<(), ExecError> {
        Ok(())
    }
    fn submit_exit(&mut self, _intent: &OrderIntent) -> Result<(), ExecError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
struct SharedNotifier {
    events: Arc<Mutex<Vec<LiveEvent>>>,
}

impl Notifier for SharedNotifier {
    fn notify(&mut self, event: &LiveEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn ts(minute: u32) -> chrono::DateTime<chrono::Utc> {
    chrono::Utc
        .with_ymd_and_hms(2025, 6, 1, minute / 60, minute % 60, 0)
        .unwrap()
}

fn flat_candle(minute: u32) -> Candle {
    Candle {
        ts: ts(minute),
        open: 100.0,
        high: 100.2,
        low: 99.8,
        close: 100.0,
        volume: 1000.0,
    }
}

fn trade(pnl_pct: f64) -> Trade {
    Trade {
        direction: Direction::Long,
        pattern: PatternKind::W,
        entry_price: 100.0,
        exit_price: 100.0 + pnl_pct,
        entry_time: ts(0),
        exit_time: ts(60),
        exit_reason: ExitReason::TrailHit,
        pnl_pct,
        r_multiple: pnl_pct / 2.0,
        is_addon: false,
    }
}

/// Win rate measured the same way the initialization backtest measures
/// it, fed straight into orchestrator construction.
#[test]
fn measured_win_rate_drives_initialization_exclusion() {
    let weak_ledger: Vec<Trade> = vec![trade(1.0), trade(-1.0), trade(-0.5), trade(2.0)];
    let strong_ledger: Vec<Trade> = vec![trade(1.0), trade(2.0), trade(-0.5), trade(1.5)];

    let rate = |ledger: &[Trade]| {
        let pnls: Vec<f64> = ledger.iter().map(|t| t.pnl_pct).collect();
        sniperlab_runner::metrics::win_rate(&pnls)
    };
    let weak = rate(&weak_ledger);
    let strong = rate(&strong_ledger);
    assert!(weak < 60.0 && strong >= 60.0);

    let notifier = SharedNotifier::default();
    let events = Arc::clone(&notifier.events);
    let orch = Orchestrator::new(
        HashMap::from([("WEAK".to_string(), weak), ("STRONG".to_string(), strong)]),
        HashMap::from([("WEAK".to_string(), 1.0), ("STRONG".to_string(), 1.0)]),
        OrchestratorConfig::default(),
        Box::new(NoopExec),
        Box::new(notifier),
    );

    assert_eq!(orch.status_of("WEAK"), Some(SymbolStatus::Excluded));
    assert_eq!(orch.status_of("STRONG"), Some(SymbolStatus::Wait));
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        LiveEvent::Excluded { symbol, .. } if symbol == "WEAK"
    ));
}

#[test]
fn worker_thread_processes_commands_and_joins() {
    let notifier = SharedNotifier::default();
    let events = Arc::clone(&notifier.events);
    let orch = Orchestrator::new(
        HashMap::from([("BTC".to_string(), 70.0), ("ETH".to_string(), 70.0)]),
        HashMap::from([("BTC".to_string(), 2.0), ("ETH".to_string(), 1.0)]),
        OrchestratorConfig::default(),
        Box::new(NoopExec),
        Box::new(notifier),
    );

    let (tx, rx) = mpsc::channel();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handle = spawn_orchestrator(rx, orch, Arc::clone(&stop_flag));

    for i in 0..20 {
        tx.send(OrchestratorCommand::CandleClosed {
            symbol: "BTC".into(),
            candle: flat_candle(i * 15),
        })
        .unwrap();
    }
    tx.send(OrchestratorCommand::FeedDown {
        symbol: "ETH".into(),
    })
    .unwrap();
    tx.send(OrchestratorCommand::CandleClosed {
        symbol: "ETH".into(),
        candle: flat_candle(0),
    })
    .unwrap();
    tx.send(OrchestratorCommand::FeedRecovered {
        symbol: "ETH".into(),
    })
    .unwrap();
    tx.send(OrchestratorCommand::Rotate).unwrap();
    // No feed attached: Poll is a no-op rather than an error.
    tx.send(OrchestratorCommand::Poll).unwrap();
    tx.send(OrchestratorCommand::Stop).unwrap();
    tx.send(OrchestratorCommand::Shutdown).unwrap();
    handle.join().unwrap();

    // Flat candles never reach the entry threshold, so nothing fired.
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn dropped_sender_shuts_the_worker_down() {
    let orch = Orchestrator::new(
        HashMap::from([("BTC".to_string(), 70.0)]),
        HashMap::from([("BTC".to_string(), 1.0)]),
        OrchestratorConfig::default(),
        Box::new(NoopExec),
        Box::new(SharedNotifier::default()),
    );
    let (tx, rx) = mpsc::channel::<OrchestratorCommand>();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handle = spawn_orchestrator(rx, orch, stop_flag);
    drop(tx);
    handle.join().unwrap();
}
