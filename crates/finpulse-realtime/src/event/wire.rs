//! Wire envelope: `{"type": <variant>, "data": {...}, "ts": <ISO-8601>}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{ConnectionAck, DomainEvent, EventKind, InboundEvent};
use crate::error::ProtocolError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// Kept as a string so a malformed timestamp does not cost the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

impl Envelope {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data,
            ts: None,
        }
    }

    #[must_use]
    pub fn with_ts(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts.to_rfc3339());
        self
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.ts
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Decode one text frame into a typed event.
pub fn decode(text: &str) -> Result<InboundEvent, ProtocolError> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
    let kind: EventKind = envelope.kind.parse()?;
    let ts = envelope.timestamp();
    let data = envelope.data;

    let event = match kind {
        EventKind::TransactionCreated => DomainEvent::TransactionCreated(payload(kind, data)?),
        EventKind::NotificationCreated => DomainEvent::NotificationCreated(payload(kind, data)?),
        EventKind::BudgetAlert => DomainEvent::BudgetAlert(payload(kind, data)?),
        EventKind::GoalProgressUpdate => DomainEvent::GoalProgressUpdate(payload(kind, data)?),
        EventKind::GoalCompleted => DomainEvent::GoalCompleted(payload(kind, data)?),
        EventKind::MilestoneReached => DomainEvent::MilestoneReached(payload(kind, data)?),
        EventKind::ConnectionAck if data.is_null() => {
            DomainEvent::ConnectionAck(ConnectionAck::default())
        }
        EventKind::ConnectionAck => DomainEvent::ConnectionAck(payload(kind, data)?),
    };

    Ok(InboundEvent { event, ts })
}

fn payload<T: DeserializeOwned>(kind: EventKind, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        kind: kind.as_str(),
        message: e.to_string(),
    })
}
