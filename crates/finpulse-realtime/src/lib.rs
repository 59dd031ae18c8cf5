//! # FinPulse Realtime
//!
//! Real-time synchronization and notification engine for a personal-finance
//! client.
//!
//! A session keeps one persistent push connection open, decodes inbound
//! frames into typed domain events, and folds them into id-deduplicated,
//! arrival-ordered stores that many UI surfaces read concurrently.
//!
//! ## Features
//!
//! - **Resilient Connection**: capped exponential backoff with jitter, heartbeat
//!   pings, terminal handling of auth rejection, generation-tagged frames
//! - **Typed Events**: a closed set of event variants; malformed frames are
//!   dropped and logged
//! - **Deterministic State**: one `reduce(state, action)` entry point for
//!   both inbound events and consumer commands
//! - **Cache Bridge**: targeted snapshot-cache invalidation per event kind,
//!   full resync after every reconnect
//! - **Effects Bus**: toasts and celebrations kept apart from state mutation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use finpulse_realtime::{NoopSnapshotCache, RealtimeConfig, RealtimeSession, Selectors};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(NoopSnapshotCache);
//!     let session = RealtimeSession::with_websocket(RealtimeConfig::default(), cache)?;
//!     session.connect("wss://api.example.com/realtime", "session-token")?;
//!
//!     let handle = session.handle();
//!     let mut changes = handle.subscribe_changes();
//!     while changes.changed().await.is_ok() {
//!         println!("unread: {}", handle.unread_notifications_count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod effects;
pub mod error;
pub mod event;
pub mod reconnect;
pub mod selectors;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cache::{CacheBridge, CacheKey, NoopSnapshotCache, SnapshotCache, invalidation_keys};
pub use config::RealtimeConfig;
pub use connection::{
    ConnectionError, ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStatus,
    Connector, Generation, WebSocketConnector,
};
pub use effects::{Celebration, UiEffect};
pub use error::{ErrorKind, ProtocolError, RealtimeError, RealtimeResult};
pub use event::{DomainEvent, EventKind, EventRouter, InboundEvent};
pub use reconnect::BackoffConfig;
pub use selectors::{Selectors, Stats};
pub use session::{RealtimeSession, SessionHandle};
pub use state::{Action, Command, RealtimeState, reduce};
pub use store::{
    AlertType, BudgetAlert, DayGroups, NotificationFilter, Priority, ReadFilter,
    RealtimeNotification, RealtimeTransaction,
};
pub use telemetry::init_tracing;
