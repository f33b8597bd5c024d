//! Synchronous publish/subscribe for [`Event`]s.
//!
//! Callbacks run on the emitting thread, in subscription order, before `emit`
//! returns. Cross-thread delivery is layered on top by the actor.

use super::{Event, EventKind};
use std::fmt::{Debug, Formatter};

pub type SubscriptionId = u64;

type Callback = Box<dyn FnMut(&Event) + Send>;

/// Which events a subscription receives.
#[derive(Debug, Clone, PartialEq)]
pub enum EventFilter {
    Any,
    Kind(EventKind),
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(k) => *k == kind,
            Self::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

struct Subscription {
    id: SubscriptionId,
    filter: EventFilter,
    once: bool,
    callback: Callback,
}

#[derive(Default)]
pub struct EventEmitter {
    subscriptions: Vec<Subscription>,
    next_id: SubscriptionId,
    muted: bool,
}

impl Debug for EventEmitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscriptions", &self.subscriptions.len())
            .field("muted", &self.muted)
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, filter: EventFilter, once: bool, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        self.subscriptions.push(Subscription {
            id,
            filter,
            once,
            callback: Box::new(callback),
        });
        id
    }

    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.subscribe(EventFilter::Kind(kind), false, callback)
    }

    /// Wildcard subscription.
    pub fn on_any<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.subscribe(EventFilter::Any, false, callback)
    }

    /// Subscription that removes itself after the first delivery.
    pub fn once<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.subscribe(EventFilter::Kind(kind), true, callback)
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Drops every subscription that would receive `kind`, wildcards included.
    pub fn unsubscribe_kind(&mut self, kind: EventKind) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| !s.filter.matches(kind));
        before - self.subscriptions.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn emit(&mut self, event: &Event) {
        let kind = event.kind();
        if self.muted && !kind.is_message_bracket() {
            return;
        }
        let mut fired_once = Vec::new();
        for sub in self.subscriptions.iter_mut() {
            if sub.filter.matches(kind) {
                (sub.callback)(event);
                if sub.once {
                    fired_once.push(sub.id);
                }
            }
        }
        if !fired_once.is_empty() {
            self.subscriptions.retain(|s| !fired_once.contains(&s.id));
        }
    }
}

#[cfg(test)]
#[path = "tests/emitter_tests.rs"]
mod tests;
