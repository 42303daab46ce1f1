//! # mythic-link
//!
//! Async Rust client for [Mythic](https://github.com/its-a-feature/Mythic)'s
//! real-time GraphQL subscriptions.
//!
//! Every subscription made through one [`MythicClient`] is multiplexed over a
//! single `graphql-transport-ws` WebSocket, opened lazily by the first
//! subscribe call and kept alive (with reconnection) until
//! [`MythicClient::close`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use mythic_link::{MythicClient, SubscriptionConfig, SubscriptionKind};
//!
//! # async fn example() -> mythic_link::Result<()> {
//! let client = MythicClient::builder()
//!     .server_url("mythic.example.com:7443")
//!     .credentials("mythic_admin", "password")
//!     .skip_tls_verify(true)
//!     .build()?;
//! client.login().await?;
//!
//! let config = SubscriptionConfig::new(SubscriptionKind::TaskOutput, |event| {
//!     log::debug!("{}", event);
//!     Ok(())
//! })
//! .with_buffer_size(256);
//!
//! let mut subscription = client.subscribe(config).await?;
//! while let Some(event) = subscription.next_event().await {
//!     for row in event.rows() {
//!         println!("{}", row["output"]);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod query;
pub mod session;
pub mod subscription;
pub mod timeouts;

pub use auth::AuthProvider;
pub use client::{MythicClient, MythicClientBuilder};
pub use config::ClientConfig;
pub use connection::{
    resolve_endpoints, Endpoints, PushMessage, PushReceiver, SubscriptionTransport,
    TransportConnector, WebSocketConnector,
};
pub use error::{BoxError, MythicLinkError, Result};
pub use event_handlers::{
    connection_error_policy, ConnectionError, DisconnectReason, ErrorDisposition, EventHandlers,
};
pub use models::{
    ConnectionOptions, LoginResponse, SubscribePayload, SubscriptionConfig, SubscriptionEvent,
    SubscriptionHandler, SubscriptionInfo, SubscriptionKind, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE,
};
pub use query::{build_subscription_query, SubscriptionQuery, Variables};
pub use session::Session;
pub use subscription::{Subscription, SubscriptionHandle, SubscriptionRegistry};
pub use timeouts::{MythicLinkTimeouts, MythicLinkTimeoutsBuilder};
pub use tokio_util::sync::CancellationToken;
