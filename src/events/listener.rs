use async_trait::async_trait;

use super::AccessEvent;

/// Receives access events after the operation that produced them succeeded.
///
/// ```rust,ignore
/// struct SeatCounter;
///
/// #[async_trait]
/// impl Listener for SeatCounter {
///     fn accepts(&self, event: &AccessEvent) -> bool {
///         matches!(event, AccessEvent::InviteRedeemed { .. } | AccessEvent::MemberRemoved { .. })
///     }
///
///     async fn handle(&self, event: &AccessEvent) {
///         // adjust billable seats for the event's scope
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Filters events before `handle`; accepts everything by default.
    fn accepts(&self, _event: &AccessEvent) -> bool {
        true
    }

    async fn handle(&self, event: &AccessEvent);
}
