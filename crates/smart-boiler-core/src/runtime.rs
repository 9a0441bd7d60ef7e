//! Async drivers for hosts that push notifications over channels.
//!
//! The engine task drains a mailbox, so notifications are handled strictly
//! one after another. The urgency poller is independent of it and only reads.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::engine::SmartBoiler;
use crate::events::{Event, StateChange};
use crate::urgency::{UrgencyAggregator, UrgencyScore};

/// Handle every notification received on `rx`, forwarding decisions to
/// `decisions`. Stops when `rx` closes.
pub fn spawn_engine(
    engine: Arc<SmartBoiler>,
    mut rx: mpsc::Receiver<StateChange>,
    decisions: mpsc::UnboundedSender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(change) = rx.recv().await {
            for event in engine.handle(&change) {
                if decisions.send(event).is_err() {
                    tracing::debug!("decision receiver dropped");
                }
            }
        }
        tracing::debug!("notification channel closed, engine task exiting");
    })
}

/// Recompute the score every `period` and publish it. Stops once every
/// receiver of `tx` is gone.
pub fn spawn_urgency_poller(
    aggregator: Arc<UrgencyAggregator>,
    period: Duration,
    tx: watch::Sender<UrgencyScore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.send(aggregator.recompute()).is_err() {
                tracing::debug!("urgency receivers dropped, poller exiting");
                break;
            }
        }
    })
}
