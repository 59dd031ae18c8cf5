//! Session state and its single mutation entry point.
//!
//! Inbound events and consumer commands are both [`Action`]s and both go
//! through [`reduce`]. The session loop is the only caller, so every store
//! has exactly one writer.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::{
    event::{ConnectionAck, DomainEvent, InboundEvent},
    store::{BudgetAlertStore, Ingest, NotificationStore, RealtimeNotification, TransactionFeed},
};

/// Server session announced by `connection_ack`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSession {
    pub session_id: Option<String>,
    pub server_time: Option<DateTime<Utc>>,
    pub acknowledged_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct RealtimeState {
    pub transactions: TransactionFeed,
    pub notifications: NotificationStore,
    pub budget_alerts: BudgetAlertStore,
    pub server_session: Option<ServerSession>,
}

/// Consumer-initiated mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    MarkTransactionsSeen,
    ClearOldTransactions { retain: usize },
    MarkNotificationRead { id: String },
    MarkNotificationUnread { id: String },
    DismissNotification { id: String },
    MarkAllNotificationsRead,
    ClearOldNotifications { retain: usize },
    DismissBudgetAlert { budget_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// An inbound event, with the local time it was received. The receive
    /// time stamps synthesized notifications so replays stay deterministic.
    Event {
        event: InboundEvent,
        received_at: DateTime<Utc>,
    },
    Command(Command),
}

impl Action {
    pub fn event(event: InboundEvent, received_at: DateTime<Utc>) -> Self {
        Self::Event { event, received_at }
    }
}

/// Apply one action, returning the next state.
pub fn reduce(mut state: RealtimeState, action: &Action) -> RealtimeState {
    state.apply(action);
    state
}

impl RealtimeState {
    /// In-place form of [`reduce`].
    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::Event { event, received_at } => self.apply_event(event, *received_at),
            Action::Command(command) => self.apply_command(command),
        }
    }

    fn apply_event(&mut self, inbound: &InboundEvent, received_at: DateTime<Utc>) {
        match &inbound.event {
            DomainEvent::TransactionCreated(tx) => {
                log_ingest("transaction", &tx.id, self.transactions.ingest(tx.clone()));
            }
            DomainEvent::NotificationCreated(notification) => {
                self.ingest_notification(notification.clone());
            }
            DomainEvent::BudgetAlert(alert) => {
                let outcome = self.budget_alerts.upsert(alert.clone());
                log_ingest("budget_alert", &alert.budget_id, outcome);
            }
            DomainEvent::GoalProgressUpdate(update) => {
                trace!(goal_id = %update.goal_id, percent = update.percent(), "Goal progress");
            }
            DomainEvent::GoalCompleted(completed) => {
                self.ingest_notification(completed.to_notification(received_at));
            }
            DomainEvent::MilestoneReached(milestone) => {
                self.ingest_notification(milestone.to_notification(received_at));
            }
            DomainEvent::ConnectionAck(ack) => self.acknowledge(ack, received_at),
        }
    }

    fn apply_command(&mut self, command: &Command) {
        match command {
            Command::MarkTransactionsSeen => {
                let changed = self.transactions.mark_seen();
                debug!(changed, "Marked transactions seen");
            }
            Command::ClearOldTransactions { retain } => {
                let dropped = self.transactions.clear_old(*retain);
                debug!(retain, dropped, "Cleared old transactions");
            }
            Command::MarkNotificationRead { id } => {
                self.notifications.mark_read(id);
            }
            Command::MarkNotificationUnread { id } => {
                self.notifications.mark_unread(id);
            }
            Command::DismissNotification { id } => {
                if self.notifications.dismiss(id).is_some() {
                    debug!(%id, "Dismissed notification");
                }
            }
            Command::MarkAllNotificationsRead => {
                let changed = self.notifications.mark_all_read();
                debug!(changed, "Marked all notifications read");
            }
            Command::ClearOldNotifications { retain } => {
                let dropped = self.notifications.clear_old(*retain);
                debug!(retain, dropped, "Cleared old notifications");
            }
            Command::DismissBudgetAlert { budget_id } => {
                self.budget_alerts.dismiss(budget_id);
            }
        }
    }

    fn ingest_notification(&mut self, notification: RealtimeNotification) {
        let id = notification.id.clone();
        log_ingest("notification", &id, self.notifications.ingest(notification));
    }

    fn acknowledge(&mut self, ack: &ConnectionAck, received_at: DateTime<Utc>) {
        debug!(session_id = ?ack.session_id, "Connection acknowledged");
        self.server_session = Some(ServerSession {
            session_id: ack.session_id.clone(),
            server_time: ack.server_time,
            acknowledged_at: received_at,
        });
    }
}

fn log_ingest(store: &'static str, id: &str, outcome: Ingest) {
    match outcome {
        Ingest::Inserted => trace!(store, %id, "Inserted"),
        Ingest::Replaced => debug!(store, %id, "Replaced existing entry"),
    }
}
