use log::{debug, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::handle::{Subscription, SubscriptionHandle, ERROR_CHANNEL_CAPACITY};
use super::pump::Pump;
use super::registry::SubscriptionRegistry;
use crate::connection::{ConnectionManager, TransportConnector};
use crate::error::{MythicLinkError, Result};
use crate::models::{SubscribePayload, SubscriptionConfig, SubscriptionInfo};
use crate::query::build_subscription_query;
use crate::session::Session;

/// Starts, tracks and stops subscriptions on the shared connection.
pub(crate) struct SubscriptionCoordinator {
    session: Session,
    connections: ConnectionManager,
    registry: Arc<SubscriptionRegistry>,
}

impl SubscriptionCoordinator {
    pub fn new(session: Session, connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            connections: ConnectionManager::new(connector, session.clone()),
            session,
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }

    /// Start a subscription that is also cancelled with `parent`.
    ///
    /// Returns once the connection has accepted the logical subscription.
    /// Configuration, session and establishment failures are returned here,
    /// before any task is spawned or registry entry created.
    pub async fn subscribe(
        &self,
        config: SubscriptionConfig,
        parent: &CancellationToken,
    ) -> Result<Subscription> {
        if !self.session.is_authenticated() {
            return Err(MythicLinkError::NotAuthenticated(
                "subscribing requires an API token or a logged-in session".to_string(),
            ));
        }
        config.validate()?;

        let (Some(kind), Some(handler)) = (config.kind, config.handler.clone()) else {
            return Err(MythicLinkError::ConfigurationError(
                "subscription type and handler are required".to_string(),
            ));
        };
        let buffer_size = config.resolved_buffer_size();
        let operation_id = config
            .explicit_operation_id()
            .or_else(|| self.session.current_operation())
            .ok_or(MythicLinkError::NoOperation)?;

        let transport = self.connections.get_connection().await?;

        let id = Uuid::new_v4().to_string();
        let (query, variables) = build_subscription_query(kind, operation_id, &config.filter);
        let payload = SubscribePayload {
            query: query.document,
            variables,
            operation_name: Some(query.operation_name.to_string()),
        };
        let (events_tx, events_rx) = mpsc::channel(buffer_size);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let push_rx = transport.subscribe(&id, payload).await?;

        let token = parent.child_token();
        let handle = SubscriptionHandle::new(id.clone(), kind, token.clone());

        let release_transport = transport.clone();
        let release_id = id.clone();
        self.registry.add_with_release(
            id.clone(),
            token,
            Box::new(move || release_transport.release(&release_id)),
        );

        // close() may have drained the registry while we were connecting.
        if self.connections.is_closed() {
            self.registry.cancel(&id);
            return Err(MythicLinkError::ClientClosed);
        }

        tokio::spawn(
            Pump {
                handle: handle.clone(),
                kind,
                handler,
                push_rx,
                events_tx,
                errors_tx,
                registry: self.registry.clone(),
                transport,
            }
            .run(),
        );

        info!(
            "[mythic-link] Subscribed '{}' to {} events for operation {}",
            id, kind, operation_id
        );
        Ok(Subscription::new(handle, buffer_size, events_rx, errors_rx))
    }

    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        if !handle.is_active() {
            return Err(MythicLinkError::InvalidInput("subscription is not active".to_string()));
        }
        if !self.registry.cancel(handle.id()) {
            debug!("[mythic-link] Subscription '{}' was not registered", handle.id());
        }
        handle.close();
        Ok(())
    }

    /// Cancel every subscription and shut the shared connection down.
    pub async fn close(&self) {
        let cancelled = self.registry.remove_all();
        self.connections.close().await;
        info!("[mythic-link] Client closed ({} subscription(s) cancelled)", cancelled);
    }

    pub fn is_closed(&self) -> bool {
        self.connections.is_closed()
    }

    pub async fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        match self.connections.current() {
            Some(transport) => transport.list_subscriptions().await,
            None => Vec::new(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_connected(&self) -> bool {
        self.connections.current().is_some_and(|t| t.is_connected())
    }
}

impl Drop for SubscriptionCoordinator {
    /// The last client clone going away stops every pump. The pumps hold the
    /// transport, so releasing them lets the shared connection shut down.
    fn drop(&mut self) {
        let cancelled = self.registry.remove_all();
        if cancelled > 0 {
            debug!(
                "[mythic-link] Client dropped without close(); cancelled {} subscription(s)",
                cancelled
            );
        }
    }
}
