//! Seams between the subscription coordinator and the shared connection.
//!
//! The coordinator only talks to [`SubscriptionTransport`]; the concrete
//! WebSocket connection is built by a [`TransportConnector`]. Tests and
//! embedders can plug in their own implementations through
//! [`MythicClientBuilder::transport_connector`](crate::MythicClientBuilder::transport_connector).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::shared::SharedConnection;
use crate::{
    error::Result,
    event_handlers::EventHandlers,
    models::{ConnectionOptions, SubscribePayload, SubscriptionInfo},
    timeouts::MythicLinkTimeouts,
};

/// One message pushed for a logical subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// The `data` object of an execution result, undecoded.
    Data(Value),
    /// A transport or GraphQL error for this subscription.
    Error(String),
    /// The server finished the subscription. Nothing follows.
    Complete,
}

/// Receiving end of a logical subscription on the transport.
pub type PushReceiver = mpsc::Receiver<PushMessage>;

/// A multiplexed connection able to carry many logical subscriptions.
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    /// Start a logical subscription under `id`. Resolves once the transport
    /// has accepted it.
    async fn subscribe(&self, id: &str, payload: SubscribePayload) -> Result<PushReceiver>;

    /// Stop the logical subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, id: &str) -> Result<()>;

    /// Best-effort, non-blocking variant of [`unsubscribe`](Self::unsubscribe).
    fn release(&self, id: &str);

    async fn list_subscriptions(&self) -> Vec<SubscriptionInfo> {
        Vec::new()
    }

    /// Stop every logical subscription and close the connection.
    async fn shutdown(&self);

    fn is_connected(&self) -> bool;
}

/// Builds the shared transport from `connection_init` parameters.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, connection_params: Value) -> Result<Arc<dyn SubscriptionTransport>>;
}

/// Default connector: a [`SharedConnection`] to Mythic's GraphQL WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    pub(crate) ws_url: String,
    pub(crate) skip_tls_verify: bool,
    pub(crate) timeouts: MythicLinkTimeouts,
    pub(crate) connection_options: ConnectionOptions,
    pub(crate) event_handlers: EventHandlers,
}

impl WebSocketConnector {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            skip_tls_verify: false,
            timeouts: MythicLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
        }
    }

    pub fn skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    pub fn timeouts(mut self, timeouts: MythicLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(&self, connection_params: Value) -> Result<Arc<dyn SubscriptionTransport>> {
        let connection = SharedConnection::connect(
            self.ws_url.clone(),
            self.skip_tls_verify,
            connection_params,
            self.timeouts.clone(),
            self.connection_options.clone(),
            self.event_handlers.clone(),
        )
        .await?;
        let transport: Arc<dyn SubscriptionTransport> = Arc::new(connection);
        Ok(transport)
    }
}
