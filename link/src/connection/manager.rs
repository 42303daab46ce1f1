use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::transport::{SubscriptionTransport, TransportConnector};
use crate::error::{MythicLinkError, Result};
use crate::session::Session;

/// Owns the single shared transport.
///
/// The transport is built on the first [`get_connection`](Self::get_connection)
/// call with the session's current credentials. Concurrent first callers
/// wait on the same construction; a failed construction is retried by the
/// next caller.
pub(crate) struct ConnectionManager {
    connector: Arc<dyn TransportConnector>,
    session: Session,
    connection: OnceCell<Arc<dyn SubscriptionTransport>>,
    closed: AtomicBool,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn TransportConnector>, session: Session) -> Self {
        Self {
            connector,
            session,
            connection: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn get_connection(&self) -> Result<Arc<dyn SubscriptionTransport>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MythicLinkError::ClientClosed);
        }
        let connection = self
            .connection
            .get_or_try_init(|| async {
                log::info!("[mythic-link] Creating shared subscription connection");
                self.connector.connect(self.session.connection_params()).await
            })
            .await?;
        Ok(connection.clone())
    }

    /// The transport, if it has been built.
    pub fn current(&self) -> Option<Arc<dyn SubscriptionTransport>> {
        self.connection.get().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Refuse new connections and shut the existing one down.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(connection) = self.connection.get() {
            connection.shutdown().await;
        }
    }
}
