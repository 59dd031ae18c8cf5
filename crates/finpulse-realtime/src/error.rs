//! Error taxonomy for the real-time engine.
//!
//! Only [`RealtimeError::Auth`] and the ongoing reconnect state ever reach
//! consumers, and they do so through the connection status rather than as
//! returned errors. Everything else is handled inside the connection manager
//! or the event router.

use std::time::Duration;

use thiserror::Error;

/// The main result type used throughout the crate.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors produced by the connection, routing and session layers.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Connection-level failure. Retried with backoff.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Authentication or handshake rejection. Terminal.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Malformed or unrecognized inbound message.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The transport closed the connection.
    #[error("Connection closed{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed { reason: Option<String> },

    /// The session event loop is no longer running.
    #[error("Session closed")]
    SessionClosed,
}

impl RealtimeError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a connection closed error.
    pub fn connection_closed(reason: Option<String>) -> Self {
        Self::ConnectionClosed { reason }
    }

    /// Whether the connection manager should retry after this error.
    ///
    /// Authentication and configuration failures are terminal.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth { .. } | Self::Config { .. })
    }

    /// Coarse classification used for status reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Protocol(_) | Self::Serialization(_) => ErrorKind::Protocol,
            Self::Config { .. } => ErrorKind::Config,
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::ConnectionClosed { .. }
            | Self::SessionClosed => ErrorKind::Transport,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match e {
            WsError::Http(response)
                if matches!(response.status().as_u16(), 401 | 403) =>
            {
                Self::auth(format!("handshake rejected with {}", response.status()))
            }
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::connection_closed(None),
            WsError::Url(err) => Self::config(format!("invalid url: {err}")),
            other => Self::transport(other.to_string()),
        }
    }
}

/// Reasons an inbound frame is dropped by the router.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame is not a JSON envelope.
    #[error("invalid JSON envelope: {0}")]
    InvalidJson(String),

    /// The envelope `type` is not part of the closed variant set.
    #[error("unknown event type `{0}`")]
    UnknownType(String),

    /// The `data` object does not match the variant's payload shape.
    #[error("invalid `{kind}` payload: {message}")]
    InvalidPayload { kind: &'static str, message: String },

    /// A binary frame did not contain UTF-8 text.
    #[error("binary frame is not valid UTF-8")]
    NonUtf8,

    /// The frame exceeded the configured maximum message size.
    #[error("frame of {size} bytes exceeds limit of {max} bytes")]
    Oversized { size: usize, max: usize },
}

/// Cloneable summary of an error, carried in the connection status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Auth,
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RealtimeError::config("Invalid URL");
        assert!(matches!(err, RealtimeError::Config { .. }));

        let err = RealtimeError::timeout(Duration::from_secs(5));
        assert!(matches!(err, RealtimeError::Timeout { .. }));

        let err = RealtimeError::auth("token expired");
        assert!(matches!(err, RealtimeError::Auth { .. }));
    }

    #[test]
    fn auth_and_config_are_terminal() {
        assert!(!RealtimeError::auth("nope").is_retryable());
        assert!(!RealtimeError::config("bad").is_retryable());
        assert!(RealtimeError::transport("reset").is_retryable());
        assert!(RealtimeError::connection_closed(None).is_retryable());
        assert!(RealtimeError::timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn kind_classification() {
        assert_eq!(RealtimeError::auth("x").kind(), ErrorKind::Auth);
        assert_eq!(RealtimeError::transport("x").kind(), ErrorKind::Transport);
        assert_eq!(RealtimeError::from(ProtocolError::NonUtf8).kind(), ErrorKind::Protocol);
    }

    #[test]
    fn connection_closed_display() {
        assert_eq!(RealtimeError::connection_closed(None).to_string(), "Connection closed");
        assert_eq!(
            RealtimeError::connection_closed(Some("pong timeout".into())).to_string(),
            "Connection closed: pong timeout"
        );
    }
}
