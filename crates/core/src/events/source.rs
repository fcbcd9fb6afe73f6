//! Notification source trait, handler registry, and an in-memory source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ChangeEvent;

/// Callback invoked for each delivered change event.
pub type EventHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Token identifying one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Trait for push-notification sources.
///
/// # Design Rules
///
/// - Handlers must be fast and non-blocking; they run on the delivery task.
/// - Every `subscribe` must be paired with an `unsubscribe` when the
///   subscriber goes away.
/// - Delivery for one event name is in arrival order; no ordering holds
///   across different names.
pub trait NotificationSource: Send + Sync {
    /// Registers `handler` for `event` and returns its token.
    fn subscribe(&self, event: ChangeEvent, handler: EventHandler) -> SubscriptionId;

    /// Removes the handler registered under `id`. Returns whether it existed.
    fn unsubscribe(&self, event: ChangeEvent, id: SubscriptionId) -> bool;
}

/// Handler bookkeeping shared by notification source implementations.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<ChangeEvent, Vec<(SubscriptionId, EventHandler)>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: ChangeEvent, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().entry(event).or_default().push((id, handler));
        id
    }

    pub fn unsubscribe(&self, event: ChangeEvent, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let Some(entries) = handlers.get_mut(&event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(&event);
        }
        removed
    }

    /// Invokes every handler registered for `event`; returns how many ran.
    ///
    /// Handlers are called outside the registry lock, so a handler may
    /// subscribe or unsubscribe without deadlocking.
    pub fn dispatch(&self, event: ChangeEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .lock()
            .get(&event)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers registered for `event`.
    pub fn handler_count(&self, event: ChangeEvent) -> usize {
        self.lock().get(&event).map_or(0, Vec::len)
    }

    /// Number of handlers registered across all events.
    pub fn total_handlers(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChangeEvent, Vec<(SubscriptionId, EventHandler)>>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// In-process source for tests - events are pushed with [`emit`].
///
/// [`emit`]: InMemoryNotificationSource::emit
#[derive(Default)]
pub struct InMemoryNotificationSource {
    registry: HandlerRegistry,
}

impl InMemoryNotificationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to its subscribers synchronously.
    pub fn emit(&self, event: ChangeEvent) -> usize {
        self.registry.dispatch(event)
    }

    pub fn handler_count(&self, event: ChangeEvent) -> usize {
        self.registry.handler_count(event)
    }

    pub fn total_handlers(&self) -> usize {
        self.registry.total_handlers()
    }
}

impl NotificationSource for InMemoryNotificationSource {
    fn subscribe(&self, event: ChangeEvent, handler: EventHandler) -> SubscriptionId {
        self.registry.subscribe(event, handler)
    }

    fn unsubscribe(&self, event: ChangeEvent, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(event, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
        let counter = counter.clone();
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_matching_subscribers() {
        let source = InMemoryNotificationSource::new();
        let tasks = Arc::new(AtomicUsize::new(0));
        let teams = Arc::new(AtomicUsize::new(0));
        source.subscribe(ChangeEvent::TasksUpdated, counting_handler(&tasks));
        source.subscribe(ChangeEvent::TeamsUpdated, counting_handler(&teams));

        assert_eq!(source.emit(ChangeEvent::TasksUpdated), 1);
        assert_eq!(source.emit(ChangeEvent::MembersUpdated), 0);

        assert_eq!(tasks.load(Ordering::SeqCst), 1);
        assert_eq!(teams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_handler() {
        let source = InMemoryNotificationSource::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let first = source.subscribe(ChangeEvent::TasksUpdated, counting_handler(&counter));
        let _second = source.subscribe(ChangeEvent::TasksUpdated, counting_handler(&counter));

        assert!(source.unsubscribe(ChangeEvent::TasksUpdated, first));
        assert!(!source.unsubscribe(ChangeEvent::TasksUpdated, first));
        assert!(!source.unsubscribe(ChangeEvent::TeamsUpdated, first));

        source.emit(ChangeEvent::TasksUpdated);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(source.total_handlers(), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let source = Arc::new(InMemoryNotificationSource::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let handler: EventHandler = {
            let source = Arc::downgrade(&source);
            let slot = slot.clone();
            Arc::new(move |event| {
                if let (Some(source), Some(id)) = (source.upgrade(), *slot.lock().unwrap()) {
                    source.unsubscribe(event, id);
                }
            })
        };
        let id = source.subscribe(ChangeEvent::TeamsUpdated, handler);
        *slot.lock().unwrap() = Some(id);

        assert_eq!(source.emit(ChangeEvent::TeamsUpdated), 1);
        assert_eq!(source.handler_count(ChangeEvent::TeamsUpdated), 0);
    }
}
