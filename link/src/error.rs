//! Error types for mythic-link.

use thiserror::Error;

/// Errors produced by the client, the shared connection and the
/// per-subscription pump tasks.
#[derive(Error, Debug)]
pub enum MythicLinkError {
    /// Client or subscription configuration was rejected before any work started.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The session holds no usable credentials.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Neither the subscription nor the session names an operation.
    #[error("Not authenticated: no current operation set")]
    NoOperation,

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// The logical subscription could not be established on the shared connection.
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    /// A transport-level error reported for one subscription while it is running.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// A pushed payload could not be decoded into an event.
    #[error("Operation failed: failed to parse event data: {0}")]
    DecodeError(String),

    /// The caller's handler returned an error for an event.
    #[error("Operation failed: handler error: {0}")]
    HandlerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Client is closed")]
    ClientClosed,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl MythicLinkError {
    /// Whether the error leaves the subscription (or client) usable.
    ///
    /// Runtime errors delivered on a subscription's error channel are
    /// recoverable: the pump keeps running after reporting them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MythicLinkError::TransportError(_)
                | MythicLinkError::DecodeError(_)
                | MythicLinkError::HandlerError(_)
                | MythicLinkError::NetworkError(_)
                | MythicLinkError::TimeoutError(_)
        )
    }

    /// Whether the error comes from missing or rejected credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            MythicLinkError::NotAuthenticated(_)
                | MythicLinkError::NoOperation
                | MythicLinkError::AuthenticationError(_)
        )
    }
}

impl From<reqwest::Error> for MythicLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MythicLinkError::TimeoutError(err.to_string())
        } else {
            MythicLinkError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MythicLinkError {
    fn from(err: serde_json::Error) -> Self {
        MythicLinkError::SerializationError(err.to_string())
    }
}

/// Boxed error returned by subscription handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for mythic-link operations.
pub type Result<T> = std::result::Result<T, MythicLinkError>;
