//! Reactor registration and dispatch.
//!
//! Every published notification is delivered to each subscribed reactor in
//! subscription order, and each reactor runs to completion before the next
//! one sees the notification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::{Event, StateChange};

/// Notification kinds a reactor can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StateChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StateChanged => "state_changed",
        }
    }
}

/// Something that reacts to host notifications.
pub trait Reactor: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Handle one state change and return the decisions it produced.
    fn on_state_changed(&self, change: &StateChange) -> Vec<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    event_type: EventType,
    reactor: Arc<dyn Reactor>,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, event_type: EventType, reactor: Arc<dyn Reactor>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        tracing::debug!(reactor = reactor.name(), event_type = event_type.as_str(), "reactor subscribed");
        self.subscriptions.push(Subscription {
            id,
            event_type,
            reactor,
        });
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.event_type == event_type)
            .count()
    }

    /// Deliver a state change to every `state_changed` subscriber.
    pub fn publish(&self, change: &StateChange) -> Vec<Event> {
        self.subscriptions
            .iter()
            .filter(|s| s.event_type == EventType::StateChanged)
            .flat_map(|s| s.reactor.on_state_changed(change))
            .collect()
    }
}
