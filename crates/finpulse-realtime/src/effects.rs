//! One-shot UI effects, kept apart from state mutation.
//!
//! Effects are derived from the state *before* an event is applied, so a
//! replayed event that only updates an existing entry does not toast twice.

use crate::{
    event::DomainEvent,
    state::RealtimeState,
    store::{BudgetAlert, GoalProgressUpdate, RealtimeNotification, RealtimeTransaction},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Celebration {
    Milestone { percent: u8 },
    GoalCompleted,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UiEffect {
    TransactionToast(RealtimeTransaction),
    NotificationToast(RealtimeNotification),
    BudgetAlert(BudgetAlert),
    GoalProgress(GoalProgressUpdate),
    Celebration {
        goal_id: String,
        goal_name: String,
        celebration: Celebration,
    },
    /// The server rejected the session's credentials. The connection stays
    /// down until the application reconnects with a fresh token.
    AuthRequired { message: String },
}

/// Effects for `event` given the state it is about to be applied to.
pub fn effects_for(pre: &RealtimeState, event: &DomainEvent) -> Vec<UiEffect> {
    let effect = match event {
        DomainEvent::TransactionCreated(tx) => (!pre.transactions.contains(&tx.id))
            .then(|| UiEffect::TransactionToast(tx.clone())),
        DomainEvent::NotificationCreated(n) => (!n.read && !pre.notifications.contains(&n.id))
            .then(|| UiEffect::NotificationToast(n.clone())),
        DomainEvent::BudgetAlert(alert) => {
            let escalated = pre
                .budget_alerts
                .get(&alert.budget_id)
                .is_none_or(|previous| previous.alert_type != alert.alert_type);
            escalated.then(|| UiEffect::BudgetAlert(alert.clone()))
        }
        DomainEvent::GoalProgressUpdate(update) => Some(UiEffect::GoalProgress(update.clone())),
        DomainEvent::GoalCompleted(completed) => (!pre
            .notifications
            .contains(&completed.notification_id()))
        .then(|| UiEffect::Celebration {
            goal_id: completed.goal_id.clone(),
            goal_name: completed.goal_name.clone(),
            celebration: Celebration::GoalCompleted,
        }),
        DomainEvent::MilestoneReached(milestone) => (!pre
            .notifications
            .contains(&milestone.notification_id()))
        .then(|| UiEffect::Celebration {
            goal_id: milestone.goal_id.clone(),
            goal_name: milestone.goal_name.clone(),
            celebration: Celebration::Milestone {
                percent: milestone.milestone,
            },
        }),
        DomainEvent::ConnectionAck(_) => None,
    };
    effect.into_iter().collect()
}
