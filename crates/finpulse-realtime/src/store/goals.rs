//! Goal events.
//!
//! Goal progress, completion and milestones are transient: nothing here is
//! retained. Completion and milestones synthesize a celebration notification
//! whose id is derived from the goal, so a replayed event lands on the same
//! notification instead of creating another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notifications::{Priority, RealtimeNotification};

pub const GOAL_NOTIFICATION_TYPE: &str = "goal";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressUpdate {
    pub goal_id: String,
    #[serde(default)]
    pub goal_name: Option<String>,
    pub current_amount_cents: i64,
    pub target_amount_cents: i64,
    #[serde(default)]
    pub progress_percent: Option<f64>,
}

impl GoalProgressUpdate {
    /// Reported percentage, or one derived from the amounts.
    pub fn percent(&self) -> f64 {
        match self.progress_percent {
            Some(percent) => percent,
            None if self.target_amount_cents > 0 => {
                self.current_amount_cents as f64 * 100.0 / self.target_amount_cents as f64
            }
            None => 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCompleted {
    pub goal_id: String,
    pub goal_name: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl GoalCompleted {
    pub fn notification_id(&self) -> String {
        format!("goal-completed:{}", self.goal_id)
    }

    pub fn to_notification(&self, now: DateTime<Utc>) -> RealtimeNotification {
        RealtimeNotification {
            id: self.notification_id(),
            kind: GOAL_NOTIFICATION_TYPE.to_string(),
            title: "Goal completed".to_string(),
            message: format!("You reached your goal \"{}\"", self.goal_name),
            priority: Priority::High,
            read: false,
            is_new: true,
            created_at: self.completed_at.unwrap_or(now),
            action_url: Some(goal_url(&self.goal_id)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneReached {
    pub goal_id: String,
    pub goal_name: String,
    /// Percentage milestone, e.g. 25, 50, 75.
    pub milestone: u8,
    #[serde(default)]
    pub message: Option<String>,
}

impl MilestoneReached {
    pub fn notification_id(&self) -> String {
        format!("milestone:{}:{}", self.goal_id, self.milestone)
    }

    pub fn to_notification(&self, now: DateTime<Utc>) -> RealtimeNotification {
        let message = self.message.clone().unwrap_or_else(|| {
            format!("{}% of \"{}\" saved", self.milestone, self.goal_name)
        });
        RealtimeNotification {
            id: self.notification_id(),
            kind: GOAL_NOTIFICATION_TYPE.to_string(),
            title: format!("{}% milestone reached", self.milestone),
            message,
            priority: Priority::Medium,
            read: false,
            is_new: true,
            created_at: now,
            action_url: Some(goal_url(&self.goal_id)),
        }
    }
}

fn goal_url(goal_id: &str) -> String {
    format!("/goals/{goal_id}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn milestone_notification_id_is_deterministic() {
        let milestone = MilestoneReached {
            goal_id: "g1".to_string(),
            goal_name: "Emergency fund".to_string(),
            milestone: 50,
            message: None,
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let a = milestone.to_notification(now);
        let b = milestone.to_notification(now + chrono::Duration::minutes(5));
        assert_eq!(a.id, "milestone:g1:50");
        assert_eq!(a.id, b.id);
        assert_eq!(a.message, "50% of \"Emergency fund\" saved");
        assert_eq!(a.action_url.as_deref(), Some("/goals/g1"));
    }

    #[test]
    fn completion_uses_completed_at_when_present() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let completed = GoalCompleted {
            goal_id: "g7".to_string(),
            goal_name: "Bike".to_string(),
            completed_at: Some(at),
        };
        let n = completed.to_notification(Utc::now());
        assert_eq!(n.id, "goal-completed:g7");
        assert_eq!(n.created_at, at);
        assert_eq!(n.priority, Priority::High);
        assert!(!n.read);
    }

    #[test]
    fn progress_percent_falls_back_to_amounts() {
        let mut update = GoalProgressUpdate {
            goal_id: "g1".to_string(),
            goal_name: None,
            current_amount_cents: 2_500,
            target_amount_cents: 10_000,
            progress_percent: None,
        };
        assert_eq!(update.percent(), 25.0);
        update.progress_percent = Some(30.0);
        assert_eq!(update.percent(), 30.0);
        update.progress_percent = None;
        update.target_amount_cents = 0;
        assert_eq!(update.percent(), 0.0);
    }
}
