//! Events fired after successful membership and invite operations.
//!
//! Dispatch happens after the cache has been invalidated, so a listener
//! that reads role facts sees the new state. Without registered listeners
//! events are dropped.
//!
//! ```rust,ignore
//! use tenantry::register_event_listeners;
//! use tenantry::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AccessEvent;
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
