use serde::{Deserialize, Serialize};

/// Options for the shared WebSocket connection.
///
/// These control reconnection behavior and the routing channel between the
/// connection task and each subscription's pump. Per-subscription settings
/// live on [`SubscriptionConfig`](crate::SubscriptionConfig).
///
/// # Example
///
/// ```rust
/// use mythic_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_auto_reconnect(true)
///     .with_reconnect_delay_ms(500)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reconnect after the socket drops.
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Initial delay between reconnection attempts, doubled on every failure.
    /// Default: 1000ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the backoff delay.
    /// Default: 30000ms
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Give up after this many consecutive failed attempts.
    /// Default: None (retry forever). `Some(0)` disables reconnection.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    /// Capacity of the per-subscription routing channel between the
    /// connection task and the subscription's pump.
    /// Default: 1024
    #[serde(default = "default_routing_channel_capacity")]
    pub routing_channel_capacity: usize,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

fn default_routing_channel_capacity() -> usize {
    1024
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_reconnect_attempts: None,
            routing_channel_capacity: default_routing_channel_capacity(),
        }
    }
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Pass None for infinite retries, Some(0) to disable reconnection.
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn with_routing_channel_capacity(mut self, capacity: usize) -> Self {
        self.routing_channel_capacity = capacity.max(1);
        self
    }

    /// Backoff delay before reconnection attempt `attempt` (0-based).
    pub fn reconnect_delay_for(&self, attempt: u32) -> u64 {
        std::cmp::min(
            self.reconnect_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
            self.max_reconnect_delay_ms,
        )
    }
}
