//! Best-effort event notification.
//!
//! Fire and forget: a notifier that fails must never affect trading
//! logic, so the trait cannot return an error at all.

use sniperlab_core::domain::{Direction, ExitReason};

/// State transitions worth telling the outside world about.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Entered {
        symbol: String,
        direction: Direction,
        entry_price: f64,
        stop_loss: f64,
    },
    Exited {
        symbol: String,
        exit_price: f64,
        reason: ExitReason,
        pnl_pct: f64,
    },
    Excluded {
        symbol: String,
        win_rate: f64,
    },
}

pub trait Notifier: Send {
    fn notify(&mut self, event: &LiveEvent);
}

/// Default notifier: structured log lines only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, event: &LiveEvent) {
        match event {
            LiveEvent::Entered {
                symbol,
                direction,
                entry_price,
                stop_loss,
            } => log::info!(
                "{symbol} entered {direction:?} at {entry_price:.4}, stop {stop_loss:.4}"
            ),
            LiveEvent::Exited {
                symbol,
                exit_price,
                reason,
                pnl_pct,
            } => log::info!("{symbol} exited at {exit_price:.4} ({reason:?}), pnl {pnl_pct:.2}%"),
            LiveEvent::Excluded { symbol, win_rate } => {
                log::warn!("{symbol} excluded, win rate {win_rate:.1}%")
            }
        }
    }
}
