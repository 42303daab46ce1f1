//! Shared connection management.
//!
//! - [`websocket`]: endpoint resolution, the upgrade request and the
//!   `connection_init` handshake
//! - [`shared`]: the multiplexed WebSocket connection with auto-reconnect
//! - [`transport`]: traits the subscription layer is written against
//! - `manager`: lazy, once-only construction of the shared transport

mod manager;
pub mod shared;
pub mod transport;
pub mod websocket;

pub(crate) use manager::ConnectionManager;
pub use transport::{
    PushMessage, PushReceiver, SubscriptionTransport, TransportConnector, WebSocketConnector,
};
pub use websocket::{resolve_endpoints, Endpoints, GRAPHQL_TRANSPORT_WS_PROTOCOL};

/// Maximum text message size (64 MiB).
pub(crate) const MAX_WS_TEXT_MESSAGE_BYTES: usize = 64 << 20;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
pub(crate) const FAR_FUTURE: std::time::Duration =
    std::time::Duration::from_secs(100 * 365 * 24 * 3600);

/// Current time in millis since Unix epoch.
#[inline]
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
