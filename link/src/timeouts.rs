//! Timeout configuration for mythic-link.
//!
//! All values are fixed when the client is built. Subscriptions themselves
//! have no timeout: they run until closed or cancelled.

use std::time::Duration;

/// Timeouts applied to HTTP requests and the shared WebSocket connection.
///
/// # Examples
///
/// ```rust
/// use mythic_link::MythicLinkTimeouts;
/// use std::time::Duration;
///
/// let timeouts = MythicLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .request_timeout_secs(300)
///     .build();
///
/// let local = MythicLinkTimeouts::fast();
/// # let _ = (timeouts, local);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MythicLinkTimeouts {
    /// TCP + TLS + WebSocket upgrade.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Wait for `connection_ack` after sending `connection_init`.
    /// Default: 10 seconds
    pub ack_timeout: Duration,

    /// Wait for the connection task to accept a subscribe command.
    /// Default: 5 seconds
    pub subscribe_timeout: Duration,

    /// Whole-request timeout for HTTP calls (`/auth`, `/refresh`).
    /// Default: 120 seconds
    pub request_timeout: Duration,

    /// Interval between WebSocket keepalive pings. Zero disables pings.
    /// Default: 15 seconds
    pub keepalive_interval: Duration,

    /// How long to wait for any frame after a keepalive ping before the
    /// socket is considered dead. Zero disables the check.
    /// Default: 5 seconds
    pub pong_timeout: Duration,
}

impl Default for MythicLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(10),
            subscribe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            keepalive_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(5),
        }
    }
}

impl MythicLinkTimeouts {
    pub fn builder() -> MythicLinkTimeoutsBuilder {
        MythicLinkTimeoutsBuilder::new()
    }

    /// Short timeouts for a Mythic instance on localhost or the same LAN.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            ack_timeout: Duration::from_secs(2),
            subscribe_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(10),
            pong_timeout: Duration::from_secs(3),
        }
    }

    /// Long timeouts for redirectors and high-latency links.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            ack_timeout: Duration::from_secs(30),
            subscribe_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(300),
            keepalive_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(15),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for [`MythicLinkTimeouts`].
#[derive(Debug, Clone)]
pub struct MythicLinkTimeoutsBuilder {
    timeouts: MythicLinkTimeouts,
}

impl MythicLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: MythicLinkTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.ack_timeout = timeout;
        self
    }

    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.subscribe_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    pub fn request_timeout_secs(self, secs: u64) -> Self {
        self.request_timeout(Duration::from_secs(secs))
    }

    /// Set to 0 to disable keepalive pings.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.timeouts.keepalive_interval = interval;
        self
    }

    /// Set to 0 to disable pong timeout checking.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.pong_timeout = timeout;
        self
    }

    pub fn build(self) -> MythicLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = MythicLinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.request_timeout, Duration::from_secs(120));
        assert_eq!(timeouts.subscribe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder() {
        let timeouts = MythicLinkTimeouts::builder()
            .connection_timeout_secs(60)
            .request_timeout_secs(30)
            .keepalive_interval(Duration::ZERO)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.request_timeout, Duration::from_secs(30));
        assert!(timeouts.keepalive_interval.is_zero());
    }

    #[test]
    fn test_presets() {
        assert!(MythicLinkTimeouts::fast().connection_timeout <= Duration::from_secs(5));
        assert!(MythicLinkTimeouts::relaxed().ack_timeout >= Duration::from_secs(30));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(MythicLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!MythicLinkTimeouts::is_no_timeout(Duration::from_secs(3600)));
    }
}
