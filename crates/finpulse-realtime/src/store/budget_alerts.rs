//! Latest alert per budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::{Ingest, Keyed, OrderedStore};

/// Alert kind reported by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Exceeded,
    /// Also covers any type this client does not know about.
    #[default]
    #[serde(other)]
    Info,
}

impl AlertType {
    /// Rank used for previews. `Exceeded` is the most severe.
    pub fn severity(self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Warning => 1,
            Self::Exceeded => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    pub budget_id: String,
    pub category: String,
    pub message: String,
    pub amount: f64,
    #[serde(default)]
    pub percent_used: Option<f64>,
    #[serde(default)]
    pub alert_type: AlertType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Keyed for BudgetAlert {
    fn key(&self) -> &str {
        &self.budget_id
    }
}

#[derive(Clone, Debug, Default)]
pub struct BudgetAlertStore {
    entries: OrderedStore<BudgetAlert>,
}

impl BudgetAlertStore {
    /// Record the latest alert for a budget. Any previous alert for the same
    /// budget is replaced and the budget becomes the most recent entry.
    pub fn upsert(&mut self, alert: BudgetAlert) -> Ingest {
        self.entries.upsert_newest(alert)
    }

    pub fn dismiss(&mut self, budget_id: &str) -> Option<BudgetAlert> {
        self.entries.remove(budget_id)
    }

    pub fn get(&self, budget_id: &str) -> Option<&BudgetAlert> {
        self.entries.get(budget_id)
    }

    /// All alerts, most recent first.
    pub fn list(&self) -> Vec<BudgetAlert> {
        self.entries.to_vec_newest_first()
    }

    /// Up to `len` alerts, most severe first, ties broken by recency.
    pub fn preview(&self, len: usize) -> Vec<BudgetAlert> {
        let mut alerts = self.list();
        // Stable sort keeps the newest-first order within a severity.
        alerts.sort_by_key(|alert| std::cmp::Reverse(alert.alert_type.severity()));
        alerts.truncate(len);
        alerts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(budget_id: &str, alert_type: AlertType, amount: f64) -> BudgetAlert {
        BudgetAlert {
            budget_id: budget_id.to_string(),
            category: "dining".to_string(),
            message: format!("{budget_id} alert"),
            amount,
            percent_used: None,
            alert_type,
            created_at: None,
        }
    }

    #[test]
    fn latest_alert_per_budget_replaces_previous() {
        let mut store = BudgetAlertStore::default();
        assert_eq!(store.upsert(alert("b1", AlertType::Warning, 80.0)), Ingest::Inserted);
        store.upsert(alert("b2", AlertType::Warning, 50.0));
        assert_eq!(store.upsert(alert("b1", AlertType::Exceeded, 120.0)), Ingest::Replaced);

        assert_eq!(store.len(), 2);
        let b1 = store.get("b1").expect("b1");
        assert_eq!(b1.alert_type, AlertType::Exceeded);
        assert_eq!(b1.amount, 120.0);
        let ids: Vec<_> = store.list().into_iter().map(|a| a.budget_id).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }

    #[test]
    fn preview_orders_by_severity_then_recency() {
        let mut store = BudgetAlertStore::default();
        store.upsert(alert("old-exceeded", AlertType::Exceeded, 1.0));
        store.upsert(alert("warning", AlertType::Warning, 1.0));
        store.upsert(alert("info", AlertType::Info, 1.0));
        store.upsert(alert("new-exceeded", AlertType::Exceeded, 1.0));

        let ids: Vec<_> = store.preview(3).into_iter().map(|a| a.budget_id).collect();
        assert_eq!(ids, vec!["new-exceeded", "old-exceeded", "warning"]);
        assert_eq!(store.preview(10).len(), 4);
        assert!(store.preview(0).is_empty());
    }

    #[test]
    fn dismiss_removes_budget() {
        let mut store = BudgetAlertStore::default();
        store.upsert(alert("b1", AlertType::Warning, 1.0));
        assert!(store.dismiss("b1").is_some());
        assert!(store.dismiss("b1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_alert_type_deserializes_as_info() {
        let json = r#"{
            "budgetId": "b9",
            "category": "travel",
            "message": "Approaching limit",
            "amount": 412.5,
            "alertType": "forecast"
        }"#;
        let alert: BudgetAlert = serde_json::from_str(json).expect("valid");
        assert_eq!(alert.alert_type, AlertType::Info);
        assert!(alert.created_at.is_none());

        let exceeded: BudgetAlert = serde_json::from_str(
            r#"{"budgetId":"b1","category":"c","message":"m","amount":1,"alertType":"exceeded"}"#,
        )
        .expect("valid");
        assert_eq!(exceeded.alert_type, AlertType::Exceeded);

        let missing: BudgetAlert =
            serde_json::from_str(r#"{"budgetId":"b2","category":"c","message":"m","amount":1}"#)
                .expect("valid");
        assert_eq!(missing.alert_type, AlertType::Info);
    }

    #[test]
    fn severity_ranks_exceeded_highest() {
        assert!(AlertType::Exceeded.severity() > AlertType::Warning.severity());
        assert!(AlertType::Warning.severity() > AlertType::Info.severity());
    }
}
