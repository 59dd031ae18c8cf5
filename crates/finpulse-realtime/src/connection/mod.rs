//! Connection manager: one live push connection per session.
//!
//! ```text
//! ┌────────────────────┐  connect()/disconnect()  ┌──────────────────────┐
//! │ ConnectionManager  │─────────────────────────▶│  connection_driver   │
//! │ (watch: status)    │                          │  (background task)   │
//! └────────────────────┘                          └──────────┬───────────┘
//!                                                            │ Connector
//!                            ConnectionEvent (mpsc)          ▼
//!        session loop ◀──────────────────────────── transport frames
//! ```
//!
//! Every `connect()` gets a fresh [`Generation`]. Status writes and frames are
//! tagged with it so a superseded driver can never overwrite newer state.

pub mod manager;
pub mod status;
pub mod transport;

pub use manager::{ConnectionEvent, ConnectionManager};
pub use status::{ConnectionError, ConnectionState, ConnectionStatus, Generation};
pub use transport::{
    CloseReason, Connector, Frame, FrameStream, FrameWriter, Target, WebSocketConnector,
};
