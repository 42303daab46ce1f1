//! Hooks for the shared connection's lifecycle.
//!
//! Handlers run on the connection task, so they must be quick and must not
//! block. Subscriptions never see these events directly: a dropped socket
//! is retried in the background and live subscriptions are re-sent once a
//! new socket is acknowledged.
//!
//! # Example
//!
//! ```rust
//! use mythic_link::{ErrorDisposition, EventHandlers};
//!
//! let handlers = EventHandlers::new()
//!     .on_connect(|| log::info!("connected to Mythic"))
//!     .on_disconnect(|reason| log::warn!("disconnected: {}", reason))
//!     .on_error(|err| log::error!("connection error: {}", err))
//!     .error_policy(|err| {
//!         if err.recoverable {
//!             ErrorDisposition::Continue
//!         } else {
//!             ErrorDisposition::StopReconnecting
//!         }
//!     });
//! # let _ = handlers;
//! ```

use std::fmt;
use std::sync::Arc;

/// Why the shared socket closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    pub message: String,
    /// WebSocket close code, if the server sent one.
    pub code: Option<u16>,
}

impl DisconnectReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code: {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// An error observed on the shared connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub message: String,
    /// Whether reconnecting may fix it (network failures are, HTTP 401 is not).
    pub recoverable: bool,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What the connection task does after reporting an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Keep going; a dropped socket is reconnected with backoff.
    Continue,
    /// Stop reconnecting. Live subscriptions are completed and new
    /// subscribe calls fail until the client is rebuilt.
    StopReconnecting,
}

/// Default policy for connection errors: log and continue.
///
/// The receive loop never stops on its own account; recovery is left to the
/// reconnection logic.
pub fn connection_error_policy(error: &ConnectionError) -> ErrorDisposition {
    if error.recoverable {
        log::warn!("[mythic-link] Connection error (will retry): {}", error);
    } else {
        log::error!("[mythic-link] Connection error: {}", error);
    }
    ErrorDisposition::Continue
}

pub type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;
pub type ErrorPolicyCallback = Arc<dyn Fn(&ConnectionError) -> ErrorDisposition + Send + Sync>;
/// Debug hook receiving raw protocol frames.
pub type OnFrameCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Connection lifecycle handlers. All optional.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) error_policy: Option<ErrorPolicyCallback>,
    pub(crate) on_receive: Option<OnFrameCallback>,
    pub(crate) on_send: Option<OnFrameCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("error_policy", &self.error_policy.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .field("on_send", &self.on_send.is_some())
            .finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called each time a socket is acknowledged, including after reconnects.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Replace [`connection_error_policy`].
    pub fn error_policy(
        mut self,
        f: impl Fn(&ConnectionError) -> ErrorDisposition + Send + Sync + 'static,
    ) -> Self {
        self.error_policy = Some(Arc::new(f));
        self
    }

    /// Every inbound text frame, before parsing.
    pub fn on_receive(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Every outbound text frame.
    pub fn on_send(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        log::info!("[mythic-link] Disconnected: {}", reason);
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    /// Report an error and return what the connection task should do next.
    pub(crate) fn emit_error(&self, error: ConnectionError) -> ErrorDisposition {
        let disposition = match &self.error_policy {
            Some(policy) => policy(&error),
            None => connection_error_policy(&error),
        };
        if let Some(cb) = &self.on_error {
            cb(error);
        }
        disposition
    }

    pub(crate) fn emit_receive(&self, raw: &str) {
        if let Some(cb) = &self.on_receive {
            cb(raw);
        }
    }

    pub(crate) fn emit_send(&self, raw: &str) {
        if let Some(cb) = &self.on_send {
            cb(raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_policy_continues() {
        let err = ConnectionError::new("Unauthorized", false);
        assert_eq!(connection_error_policy(&err), ErrorDisposition::Continue);
        assert_eq!(EventHandlers::new().emit_error(err), ErrorDisposition::Continue);
    }

    #[test]
    fn test_custom_policy_and_callback() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = seen.clone();
        let handlers = EventHandlers::new()
            .on_error(move |_| {
                seen_cb.fetch_add(1, Ordering::SeqCst);
            })
            .error_policy(|err| {
                if err.recoverable {
                    ErrorDisposition::Continue
                } else {
                    ErrorDisposition::StopReconnecting
                }
            });

        assert_eq!(
            handlers.emit_error(ConnectionError::new("reset", true)),
            ErrorDisposition::Continue
        );
        assert_eq!(
            handlers.emit_error(ConnectionError::new("Forbidden", false)),
            ErrorDisposition::StopReconnecting
        );
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(DisconnectReason::new("bye").to_string(), "bye");
        assert_eq!(DisconnectReason::with_code("bye", 1000).to_string(), "bye (code: 1000)");
    }
}
