use async_trait::async_trait;

use crate::events::{AccessEvent, Listener};

/// Emits each access event as a `tracing` event inside the caller's span.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &AccessEvent) {
        tracing::info!(
            target: "tenantry::events",
            event_name = event.name(),
            at = %event.timestamp(),
            detail = ?event,
            "access event"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_handle_without_subscriber() {
        let event = AccessEvent::OnboardingCompleted { user_id: 1, at: Utc::now() };
        TracingListener.handle(&event).await;
    }
}
