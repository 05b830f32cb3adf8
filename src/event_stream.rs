/// publish/subscribe for the domain event family
///
/// The manager only ever calls [`EventStream::subscribe`] once, when it starts. Anything that
/// implements the trait can stand in for the in-process [`EventBus`].
///
use log::*;
use std::sync::{Arc, Mutex};

use crate::event::DomainEvent;

/// receives every published domain event
pub trait Subscriber: Send + Sync {
    /// hand over one event; return false once the subscriber is gone for good
    fn notify(&self, event: Arc<dyn DomainEvent>) -> bool;

    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

pub trait EventStream: Send + Sync {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>);
}

/// Fan-out of published events to all live subscribers.
///
/// Cloning is cheap; clones share the subscriber list. Subscribers that report
/// themselves gone are dropped on the next publish.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Arc<dyn Subscriber>>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// deliver the event to every subscriber, returns the number that accepted it
    pub fn publish(&self, event: Arc<dyn DomainEvent>) -> usize {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let before = subscribers.len();
        subscribers.retain(|sub| sub.notify(Arc::clone(&event)));

        let dropped = before - subscribers.len();
        if dropped > 0 {
            debug!("dropped {} closed subscriber(s)", dropped);
        }

        subscribers.len()
    }

    pub fn len(&self) -> usize {
        match self.subscribers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventStream for EventBus {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        info!("subscribing {} to domain events", subscriber.name());
        match self.subscribers.lock() {
            Ok(mut guard) => guard.push(subscriber),
            Err(poisoned) => poisoned.into_inner().push(subscriber),
        }
    }
}
