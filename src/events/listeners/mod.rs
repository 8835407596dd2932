//! Listeners shipped with the crate.

mod logging;
#[cfg(feature = "tracing")]
mod tracing;

pub use logging::LoggingListener;
#[cfg(feature = "tracing")]
pub use self::tracing::TracingListener;
