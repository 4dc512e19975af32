//! Synchronous publish/subscribe channel for boot lifecycle events.

use crate::level::BootLevel;

/// Immutable lifecycle notification published by the kernel.
///
/// Failure events carry the rendered error text; the typed error itself
/// stays with the kernel state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEvent {
    BeforeLevel { level: BootLevel },
    LevelSucceeded { level: BootLevel },
    LevelFailed { level: BootLevel, error: String },
    /// All levels were reached.
    BootSucceeded { level: BootLevel },
    /// Some level failed; `level` is the one that failed.
    BootFailed { level: BootLevel, error: String },
}

type Subscriber = Box<dyn FnMut(&BootEvent)>;

/// Ordered callback list with synchronous delivery.
///
/// Subscribers run in registration order; no level begins before every
/// callback for the previous event has returned.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&BootEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn publish(&mut self, event: &BootEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
