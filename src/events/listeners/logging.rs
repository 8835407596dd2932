use async_trait::async_trait;

use crate::events::{AccessEvent, Listener};

/// Writes one logfmt line per access event to the `tenantry::events` target.
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Logs at `INFO`.
    pub fn new() -> Self {
        Self::with_level(log::Level::Info)
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    fn accepts(&self, _event: &AccessEvent) -> bool {
        log::log_enabled!(target: "tenantry::events", self.level)
    }

    async fn handle(&self, event: &AccessEvent) {
        log::log!(
            target: "tenantry::events",
            self.level,
            "msg=\"access event\", event=\"{}\", at=\"{}\", detail=\"{:?}\"",
            event.name(),
            event.timestamp().to_rfc3339(),
            event
        );
    }
}
