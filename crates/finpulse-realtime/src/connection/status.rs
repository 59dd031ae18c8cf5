//! Connection status as observed by consumers.

use std::fmt;

use crate::error::{ErrorKind, RealtimeError};

/// Identifies one `connect()` call. Frames and status writes carry the
/// generation that produced them so anything from a superseded connection
/// can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection state machine states.
///
/// ```text
/// Disconnected --connect()--> Connecting --open--> Connected
/// Connected --close/error--> Reconnecting --timer--> Connecting
/// any --disconnect()/auth failure--> Disconnected
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the last connection failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RealtimeError> for ConnectionError {
    fn from(err: &RealtimeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Snapshot of the connection manager's state.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Retries since the last successful open. Reset to 0 only on open.
    pub reconnect_attempts: u32,
    pub last_error: Option<ConnectionError>,
    pub generation: Generation,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Disconnected because the server rejected our credentials. No automatic
    /// retry happens from this state; a fresh `connect()` is required.
    pub fn requires_reauth(&self) -> bool {
        self.status == ConnectionStatus::Disconnected
            && self
                .last_error
                .as_ref()
                .is_some_and(|err| err.kind == ErrorKind::Auth)
    }
}
