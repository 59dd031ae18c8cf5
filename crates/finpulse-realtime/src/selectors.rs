//! Read-only projections for UI consumers.
//!
//! Every selector reads one consistent snapshot: an event is either fully
//! visible or not visible at all.

use chrono::{DateTime, TimeZone};

use crate::{
    connection::ConnectionState,
    state::RealtimeState,
    store::{BudgetAlert, DayGroups, NotificationFilter, RealtimeNotification, RealtimeTransaction},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub transaction_count: usize,
    pub notification_count: usize,
    pub new_transaction_count: usize,
}

impl Stats {
    pub fn of(state: &RealtimeState) -> Self {
        Self {
            transaction_count: state.transactions.len(),
            notification_count: state.notifications.len(),
            new_transaction_count: state.transactions.new_count(),
        }
    }
}

pub trait Selectors {
    /// Run `f` against a consistent snapshot of the state.
    fn with_state<R>(&self, f: impl FnOnce(&RealtimeState) -> R) -> R;

    fn connection_status(&self) -> ConnectionState;

    fn recent_transactions(&self) -> Vec<RealtimeTransaction> {
        self.with_state(|s| s.transactions.recent())
    }

    fn notifications(&self) -> Vec<RealtimeNotification> {
        self.with_state(|s| s.notifications.list())
    }

    fn filtered_notifications(&self, filter: &NotificationFilter) -> Vec<RealtimeNotification> {
        self.with_state(|s| s.notifications.filter(filter))
    }

    /// Notifications bucketed into today / yesterday / older in `now`'s zone.
    fn grouped_notifications<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DayGroups {
        self.with_state(|s| s.notifications.group_by_day(now))
    }

    fn unread_notifications_count(&self) -> usize {
        self.with_state(|s| s.notifications.unread_count())
    }

    fn budget_alerts(&self) -> Vec<BudgetAlert> {
        self.with_state(|s| s.budget_alerts.list())
    }

    fn budget_alert_preview(&self, len: usize) -> Vec<BudgetAlert> {
        self.with_state(|s| s.budget_alerts.preview(len))
    }

    fn stats(&self) -> Stats {
        self.with_state(Stats::of)
    }
}
