use std::sync::OnceLock;

use super::{AccessEvent, Listener};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

/// Listeners that receive access events, in registration order.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventRegistry {
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hands `event` to every listener whose [`Listener::accepts`] is true.
    pub async fn dispatch(&self, event: &AccessEvent) {
        for listener in self.listeners.iter().filter(|l| l.accepts(event)) {
            listener.handle(event).await;
        }
    }
}

/// Installs the process-wide listeners. Call once at startup.
///
/// Later calls are ignored with a warning.
///
/// ```rust,ignore
/// use tenantry::register_event_listeners;
/// use tenantry::events::listeners::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::new());
/// });
/// ```
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::default();
    f(&mut registry);
    let count = registry.len();
    if REGISTRY.set(registry).is_err() {
        log::warn!(target: "tenantry", "msg=\"event listeners already registered, ignoring\"");
        return;
    }
    log::debug!(target: "tenantry", "msg=\"event listeners registered\", count={count}");
}

/// Sends `event` to the installed listeners; a no-op before registration.
pub async fn dispatch(event: AccessEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.dispatch(&event).await;
    }
}
