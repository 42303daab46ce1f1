//! Subscription metadata exposed to callers.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of a subscription as seen by the shared connection.
///
/// Returned by [`MythicClient::subscriptions()`](crate::MythicClient::subscriptions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Subscription ID assigned when subscribing.
    pub id: String,
    /// GraphQL operation name of the subscription document.
    pub operation_name: Option<String>,
    /// Timestamp (millis since Unix epoch) when the subscription was registered.
    pub created_at_ms: u64,
    /// Timestamp (millis since Unix epoch) of the last routed message,
    /// or `None` if nothing has arrived yet.
    pub last_event_time_ms: Option<u64>,
    /// Number of messages routed to the subscription.
    pub events_routed: u64,
}
