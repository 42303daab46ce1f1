//! Per-subscription pump task.
//!
//! Reads the logical subscription's push channel, decodes each payload into
//! a [`SubscriptionEvent`], runs the caller's handler and forwards the event.
//! Every send races the subscription's cancellation token, so an undrained
//! consumer can delay events but never teardown.

use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::handle::SubscriptionHandle;
use super::registry::SubscriptionRegistry;
use crate::connection::{PushMessage, PushReceiver, SubscriptionTransport};
use crate::error::MythicLinkError;
use crate::models::{SubscriptionEvent, SubscriptionHandler, SubscriptionKind};

/// Everything the pump owns. Nothing here borrows from the coordinator.
pub(crate) struct Pump {
    pub handle: SubscriptionHandle,
    pub kind: SubscriptionKind,
    pub handler: SubscriptionHandler,
    pub push_rx: PushReceiver,
    pub events_tx: mpsc::Sender<SubscriptionEvent>,
    pub errors_tx: mpsc::Sender<MythicLinkError>,
    pub registry: Arc<SubscriptionRegistry>,
    pub transport: Arc<dyn SubscriptionTransport>,
}

impl Pump {
    pub async fn run(mut self) {
        let id = self.handle.id().to_string();
        debug!("[mythic-link] Pump started for subscription '{}'", id);

        loop {
            let message = tokio::select! {
                biased;
                _ = self.handle.token().cancelled() => break,
                message = self.push_rx.recv() => message,
            };

            match message {
                Some(PushMessage::Data(data)) => {
                    let event = match SubscriptionEvent::decode(self.kind, data) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("[mythic-link] Dropping message for '{}': {}", id, e);
                            if !self.report(e).await {
                                break;
                            }
                            continue;
                        },
                    };

                    if let Err(e) = (self.handler)(&event) {
                        if !self.report(MythicLinkError::HandlerError(e.to_string())).await {
                            break;
                        }
                    }

                    if !self.forward(event).await {
                        break;
                    }
                },
                Some(PushMessage::Error(message)) => {
                    if !self.report(MythicLinkError::TransportError(message)).await {
                        break;
                    }
                },
                Some(PushMessage::Complete) | None => {
                    debug!("[mythic-link] Subscription '{}' completed by the connection", id);
                    break;
                },
            }
        }

        self.teardown(&id).await;
    }

    /// Returns `false` when the subscription was cancelled instead.
    async fn forward(&self, event: SubscriptionEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.handle.token().cancelled() => false,
            sent = self.events_tx.send(event) => sent.is_ok(),
        }
    }

    async fn report(&self, error: MythicLinkError) -> bool {
        tokio::select! {
            biased;
            _ = self.handle.token().cancelled() => false,
            // A dropped error receiver only means nobody is listening.
            _ = self.errors_tx.send(error) => true,
        }
    }

    async fn teardown(self, id: &str) {
        self.handle.close();
        self.registry.remove(id);
        if let Err(e) = self.transport.unsubscribe(id).await {
            debug!("[mythic-link] Release of '{}' failed: {}", id, e);
        }
        debug!("[mythic-link] Pump stopped for subscription '{}'", id);
        // Dropping the senders ends the caller's streams after buffered items.
    }
}
