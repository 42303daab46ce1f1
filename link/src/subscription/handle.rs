use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{MythicLinkError, Result};
use crate::models::{SubscriptionEvent, SubscriptionKind};

/// Capacity of every subscription's error channel.
pub const ERROR_CHANNEL_CAPACITY: usize = 10;

struct HandleInner {
    id: String,
    kind: SubscriptionKind,
    closed: AtomicBool,
    token: CancellationToken,
}

/// Cloneable control handle for one subscription.
///
/// Shared by the caller-facing [`Subscription`] and its pump task. Closing
/// is idempotent and may race freely: only the first caller flips the flag
/// and cancels the token.
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: String, kind: SubscriptionKind, token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                kind,
                closed: AtomicBool::new(false),
                token,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.inner.kind
    }

    /// `false` once closed, or once a parent cancellation reached it.
    pub fn is_active(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire) && !self.inner.token.is_cancelled()
    }

    /// Mark the subscription closed and stop its pump.
    ///
    /// Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        let first = self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.inner.token.cancel();
        }
        first
    }

    /// Resolves once the subscription is closed or cancelled.
    pub async fn done(&self) {
        self.inner.token.cancelled().await
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.inner.token
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A live subscription as seen by the caller.
///
/// Events arrive in push order on [`events`](Self::events); recoverable
/// problems (undecodable payloads, handler failures, GraphQL errors) arrive
/// on [`errors`](Self::errors) without ending the subscription. Once
/// [`done`](Self::done) resolves nothing more will be delivered.
///
/// Dropping a `Subscription` stops it only when the next event finds the
/// event channel gone; call [`close`](Self::close) or
/// `MythicClient::unsubscribe` to stop it right away.
pub struct Subscription {
    handle: SubscriptionHandle,
    buffer_size: usize,
    events: mpsc::Receiver<SubscriptionEvent>,
    errors: mpsc::Receiver<MythicLinkError>,
}

impl Subscription {
    pub(crate) fn new(
        handle: SubscriptionHandle,
        buffer_size: usize,
        events: mpsc::Receiver<SubscriptionEvent>,
        errors: mpsc::Receiver<MythicLinkError>,
    ) -> Self {
        Self {
            handle,
            buffer_size,
            events,
            errors,
        }
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.handle.kind()
    }

    /// Capacity of the event channel.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Close the subscription. Safe to call any number of times.
    pub fn close(&self) {
        self.handle.close();
    }

    pub async fn done(&self) {
        self.handle.done().await
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next event or error, whichever is ready first.
    ///
    /// Returns `None` once both channels are closed and drained.
    pub async fn next(&mut self) -> Option<Result<SubscriptionEvent>> {
        let mut events_open = true;
        let mut errors_open = true;
        while events_open || errors_open {
            tokio::select! {
                event = self.events.recv(), if events_open => match event {
                    Some(event) => return Some(Ok(event)),
                    None => events_open = false,
                },
                error = self.errors.recv(), if errors_open => match error {
                    Some(error) => return Some(Err(error)),
                    None => errors_open = false,
                },
            }
        }
        None
    }

    pub async fn next_event(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    pub async fn next_error(&mut self) -> Option<MythicLinkError> {
        self.errors.recv().await
    }

    pub fn events(&mut self) -> &mut mpsc::Receiver<SubscriptionEvent> {
        &mut self.events
    }

    pub fn errors(&mut self) -> &mut mpsc::Receiver<MythicLinkError> {
        &mut self.errors
    }

    /// Split into the control handle and both receivers.
    pub fn into_parts(
        self,
    ) -> (
        SubscriptionHandle,
        mpsc::Receiver<SubscriptionEvent>,
        mpsc::Receiver<MythicLinkError>,
    ) {
        (self.handle, self.events, self.errors)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("buffer_size", &self.buffer_size)
            .field("active", &self.is_active())
            .finish()
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_active() { "active" } else { "inactive" };
        write!(f, "Subscription {}: {} ({})", self.id(), self.kind(), state)
    }
}
