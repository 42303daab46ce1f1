use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::subscription_event::SubscriptionEvent;
use super::subscription_kind::SubscriptionKind;
use crate::error::{BoxError, MythicLinkError, Result};

/// Event buffer capacity used when `buffer_size` is 0.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Largest event buffer a bounded channel can hold.
pub const MAX_BUFFER_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Callback invoked by the pump task for every decoded event, before the
/// event is forwarded to the subscription's event channel.
///
/// A returned error is reported on the error channel; the event is still
/// delivered.
pub type SubscriptionHandler =
    Arc<dyn Fn(&SubscriptionEvent) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Configuration for one real-time subscription.
///
/// # Example
///
/// ```rust
/// use mythic_link::{SubscriptionConfig, SubscriptionKind};
///
/// let config = SubscriptionConfig::new(SubscriptionKind::Callback, |event| {
///     println!("{}", event);
///     Ok(())
/// })
/// .with_buffer_size(256)
/// .with_operation_id(3);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct SubscriptionConfig {
    /// Event category. Required.
    pub kind: Option<SubscriptionKind>,
    /// Per-event callback. Required.
    pub handler: Option<SubscriptionHandler>,
    /// Event channel capacity. `0` selects [`DEFAULT_BUFFER_SIZE`].
    pub buffer_size: i64,
    /// Operation to scope events to. `None` or `0` uses the session's
    /// current operation.
    pub operation_id: Option<i64>,
    /// Extra GraphQL variables, merged verbatim after `operation_id`.
    pub filter: Map<String, Value>,
}

impl SubscriptionConfig {
    pub fn new<F>(kind: SubscriptionKind, handler: F) -> Self
    where
        F: Fn(&SubscriptionEvent) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            kind: Some(kind),
            handler: Some(Arc::new(handler)),
            ..Self::default()
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: i64) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_operation_id(mut self, operation_id: i64) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    /// Check the configuration without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_none() {
            return Err(MythicLinkError::ConfigurationError(
                "subscription type cannot be empty".to_string(),
            ));
        }
        if self.handler.is_none() {
            return Err(MythicLinkError::ConfigurationError(
                "subscription handler is required".to_string(),
            ));
        }
        if self.buffer_size < 0 {
            return Err(MythicLinkError::ConfigurationError(
                "buffer size cannot be negative".to_string(),
            ));
        }
        if self.buffer_size as u64 > MAX_BUFFER_SIZE as u64 {
            return Err(MythicLinkError::ConfigurationError(format!(
                "buffer size cannot exceed {}",
                MAX_BUFFER_SIZE
            )));
        }
        if matches!(self.operation_id, Some(id) if id < 0) {
            return Err(MythicLinkError::ConfigurationError(
                "operation id cannot be negative".to_string(),
            ));
        }
        if let Some(key) = self.filter.keys().find(|key| !is_graphql_name(key)) {
            return Err(MythicLinkError::ConfigurationError(format!(
                "filter key '{}' is not a valid GraphQL variable name",
                key
            )));
        }
        if matches!(self.filter.get("operation_id"), Some(v) if !v.is_i64()) {
            return Err(MythicLinkError::ConfigurationError(
                "filter 'operation_id' must be an integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Event channel capacity after applying the default.
    pub(crate) fn resolved_buffer_size(&self) -> usize {
        match usize::try_from(self.buffer_size) {
            Ok(0) | Err(_) => DEFAULT_BUFFER_SIZE,
            Ok(size) => size,
        }
    }

    /// Explicit operation id, treating `0` as unset.
    pub(crate) fn explicit_operation_id(&self) -> Option<i64> {
        self.operation_id.filter(|id| *id != 0)
    }
}

fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {},
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl fmt::Debug for SubscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionConfig")
            .field("kind", &self.kind)
            .field("handler", &self.handler.is_some())
            .field("buffer_size", &self.buffer_size)
            .field("operation_id", &self.operation_id)
            .field("filter", &self.filter)
            .finish()
    }
}

impl fmt::Display for SubscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.map(|k| k.as_str()).unwrap_or("<unset>");
        match self.explicit_operation_id() {
            Some(op) => write!(f, "Subscription: {} (operation {})", kind, op),
            None => write!(f, "Subscription: {}", kind),
        }
    }
}
