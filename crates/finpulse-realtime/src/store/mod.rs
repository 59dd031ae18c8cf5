//! Domain stores: id-unique, arrival-ordered collections, one per event
//! category. Eviction is always explicit.

pub mod budget_alerts;
pub mod goals;
pub mod notifications;
pub mod ordered;
pub mod transactions;

pub use budget_alerts::{AlertType, BudgetAlert, BudgetAlertStore};
pub use goals::{GoalCompleted, GoalProgressUpdate, MilestoneReached};
pub use notifications::{
    DayGroups, NotificationFilter, NotificationStore, Priority, ReadFilter, RealtimeNotification,
};
pub use ordered::{Ingest, Keyed, OrderedStore};
pub use transactions::{RealtimeTransaction, TransactionFeed};
