//! Session configuration.

use std::time::Duration;

use crate::reconnect::BackoffConfig;

/// Configuration for a real-time session.
///
/// The endpoint URL and session token are not part of the configuration;
/// they are supplied per [`connect`](crate::session::RealtimeSession::connect)
/// call so a session can be re-pointed after re-authentication.
#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    // Reconnection settings
    /// Delay before the first reconnection attempt.
    pub reconnect_initial_delay: Duration,
    /// Upper bound for any reconnection delay.
    pub reconnect_max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub reconnect_backoff_factor: f64,
    /// Random jitter factor (0.0-1.0) for reconnection delays.
    pub reconnect_jitter: f64,

    // Connection
    /// Timeout for the transport handshake.
    pub connect_timeout: Duration,
    /// Bound on how long `disconnect()` waits for the close handshake.
    pub close_timeout: Duration,
    /// Interval between heartbeat pings.
    pub ping_interval: Duration,
    /// Maximum silence after a ping before the link is considered dead.
    pub pong_timeout: Duration,
    /// Frames larger than this are dropped.
    pub max_message_size: usize,

    // Channels
    /// Capacity of the connection event channel.
    pub event_channel_capacity: usize,
    /// Capacity of the consumer command channel.
    pub command_channel_capacity: usize,
    /// Capacity of the UI effect broadcast channel.
    pub effect_channel_capacity: usize,

    // Views
    /// Number of budget alerts in the preview selector.
    pub budget_alert_preview_len: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
            reconnect_backoff_factor: 2.0,
            reconnect_jitter: 0.2,
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            max_message_size: 1024 * 1024, // 1 MiB
            event_channel_capacity: 256,
            command_channel_capacity: 64,
            effect_channel_capacity: 64,
            budget_alert_preview_len: 3,
        }
    }
}

impl RealtimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconnection initial delay.
    #[must_use]
    pub fn reconnect_initial_delay(mut self, delay: Duration) -> Self {
        self.reconnect_initial_delay = delay;
        self
    }

    /// Set the maximum reconnection delay.
    #[must_use]
    pub fn reconnect_max_delay(mut self, delay: Duration) -> Self {
        self.reconnect_max_delay = delay;
        self
    }

    /// Set the reconnection backoff factor.
    #[must_use]
    pub fn reconnect_backoff_factor(mut self, factor: f64) -> Self {
        self.reconnect_backoff_factor = factor;
        self
    }

    /// Set the reconnection jitter factor.
    #[must_use]
    pub fn reconnect_jitter(mut self, jitter: f64) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Set the handshake timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the close handshake bound.
    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set the ping interval.
    #[must_use]
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the pong timeout.
    #[must_use]
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Set the maximum accepted frame size.
    #[must_use]
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Set the effect channel capacity.
    #[must_use]
    pub fn effect_channel_capacity(mut self, capacity: usize) -> Self {
        self.effect_channel_capacity = capacity;
        self
    }

    /// Set the budget alert preview length.
    #[must_use]
    pub fn budget_alert_preview_len(mut self, len: usize) -> Self {
        self.budget_alert_preview_len = len;
        self
    }

    pub(crate) fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.reconnect_initial_delay,
            max_delay: self.reconnect_max_delay,
            factor: self.reconnect_backoff_factor,
            jitter: self.reconnect_jitter,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.backoff().validate()?;
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.close_timeout.is_zero() {
            return Err("Close timeout must be > 0".to_string());
        }
        if self.ping_interval.is_zero() {
            return Err("Ping interval must be > 0".to_string());
        }
        if self.pong_timeout.is_zero() {
            return Err("Pong timeout must be > 0".to_string());
        }
        if self.max_message_size == 0 {
            return Err("Max message size must be > 0".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err("Event channel capacity must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        if self.effect_channel_capacity == 0 {
            return Err("Effect channel capacity must be > 0".to_string());
        }
        Ok(())
    }
}
