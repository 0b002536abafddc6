use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use agora_types::{EventKind, ServerEvent};

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Typed publish/subscribe fan-out for server events.
///
/// Listeners register per message-type tag and are invoked synchronously, in
/// registration order. Publishing iterates over a snapshot of the listener
/// list and re-checks liveness per listener, so `unsubscribe` is safe to call
/// from inside a callback: a listener removed mid-publish is not invoked for
/// the remainder of that publish.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: SubscriptionId,
    listeners: HashMap<EventKind, Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Idempotent: unknown or already-removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        for list in inner.listeners.values_mut() {
            list.retain(|(sid, _)| *sid != id);
        }
    }

    pub fn publish(&self, event: &ServerEvent) {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Listener)> = {
            let inner = self.lock();
            inner.listeners.get(&kind).cloned().unwrap_or_default()
        };
        for (id, listener) in snapshot {
            let live = {
                let inner = self.lock();
                inner
                    .listeners
                    .get(&kind)
                    .is_some_and(|list| list.iter().any(|(sid, _)| *sid == id))
            };
            if live {
                listener(event);
            }
        }
    }

    /// Drops every registered listener. Part of releasing a transport handle.
    pub fn clear(&self) {
        self.lock().listeners.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
