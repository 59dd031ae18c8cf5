//! Typed inbound events.
//!
//! Frames are decoded in [`wire`] into exactly one [`DomainEvent`] variant;
//! [`router::EventRouter`] drops and logs anything that does not decode.

pub mod router;
pub mod wire;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ProtocolError,
    store::{
        BudgetAlert, GoalCompleted, GoalProgressUpdate, MilestoneReached, RealtimeNotification,
        RealtimeTransaction,
    },
};

pub use router::EventRouter;
pub use wire::{Envelope, decode};

/// The closed set of inbound event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransactionCreated,
    NotificationCreated,
    BudgetAlert,
    GoalProgressUpdate,
    GoalCompleted,
    MilestoneReached,
    ConnectionAck,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::TransactionCreated,
        Self::NotificationCreated,
        Self::BudgetAlert,
        Self::GoalProgressUpdate,
        Self::GoalCompleted,
        Self::MilestoneReached,
        Self::ConnectionAck,
    ];

    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionCreated => "transaction_created",
            Self::NotificationCreated => "notification_created",
            Self::BudgetAlert => "budget_alert",
            Self::GoalProgressUpdate => "goal_progress_update",
            Self::GoalCompleted => "goal_completed",
            Self::MilestoneReached => "milestone_reached",
            Self::ConnectionAck => "connection_ack",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

/// Server acknowledgement sent after the connection opens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAck {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub server_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    TransactionCreated(RealtimeTransaction),
    NotificationCreated(RealtimeNotification),
    BudgetAlert(BudgetAlert),
    GoalProgressUpdate(GoalProgressUpdate),
    GoalCompleted(GoalCompleted),
    MilestoneReached(MilestoneReached),
    ConnectionAck(ConnectionAck),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::TransactionCreated(_) => EventKind::TransactionCreated,
            Self::NotificationCreated(_) => EventKind::NotificationCreated,
            Self::BudgetAlert(_) => EventKind::BudgetAlert,
            Self::GoalProgressUpdate(_) => EventKind::GoalProgressUpdate,
            Self::GoalCompleted(_) => EventKind::GoalCompleted,
            Self::MilestoneReached(_) => EventKind::MilestoneReached,
            Self::ConnectionAck(_) => EventKind::ConnectionAck,
        }
    }
}

/// A decoded event with the envelope's server timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub event: DomainEvent,
    pub ts: Option<DateTime<Utc>>,
}

impl InboundEvent {
    pub fn new(event: DomainEvent) -> Self {
        Self { event, ts: None }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
