//! Notifications and their read/unread/dismissed state.
//!
//! The unread count is recomputed after every mutation so that
//! `unread_count() == number of entries with read == false` holds at every
//! point a reader can observe.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::{Ingest, Keyed, OrderedStore};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    /// May arrive pre-marked as read.
    #[serde(default)]
    pub read: bool,
    #[serde(skip_deserializing)]
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub action_url: Option<String>,
}

impl Keyed for RealtimeNotification {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotificationStore {
    entries: OrderedStore<RealtimeNotification>,
    unread: usize,
}

impl NotificationStore {
    /// Add a notification as the most recent entry.
    ///
    /// A known id keeps its position and takes the incoming content; it stays
    /// read if either copy was read, so a replay cannot un-read it.
    pub fn ingest(&mut self, mut notification: RealtimeNotification) -> Ingest {
        notification.is_new = !notification.read;
        let outcome = self.entries.upsert_in_place(notification, |existing, incoming| {
            let read = existing.read || incoming.read;
            let is_new = existing.is_new && !read;
            *existing = incoming;
            existing.read = read;
            existing.is_new = is_new;
        });
        self.recount();
        outcome
    }

    /// Returns `false` if the id is unknown. Idempotent.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.read = true;
        entry.is_new = false;
        self.recount();
        true
    }

    /// Returns `false` if the id is unknown. Idempotent.
    pub fn mark_unread(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.read = false;
        self.recount();
        true
    }

    /// Permanently remove a notification.
    pub fn dismiss(&mut self, id: &str) -> Option<RealtimeNotification> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.recount();
        }
        removed
    }

    /// Returns how many entries changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in self.entries.values_mut() {
            if !entry.read {
                changed += 1;
            }
            entry.read = true;
            entry.is_new = false;
        }
        self.recount();
        changed
    }

    /// Keep the `retain` most recent entries. Returns how many were dropped.
    pub fn clear_old(&mut self, retain: usize) -> usize {
        let dropped = self.entries.retain_newest(retain);
        self.recount();
        dropped
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn get(&self, id: &str) -> Option<&RealtimeNotification> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RealtimeNotification> {
        self.entries.iter_newest_first()
    }

    pub fn list(&self) -> Vec<RealtimeNotification> {
        self.entries.to_vec_newest_first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter(&self, filter: &NotificationFilter) -> Vec<RealtimeNotification> {
        self.iter().filter(|n| filter.matches(n)).cloned().collect()
    }

    pub fn group_by_day<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DayGroups {
        group_by_day(self.iter(), now)
    }

    fn recount(&mut self) {
        self.unread = self.entries.iter_newest_first().filter(|n| !n.read).count();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

/// Non-mutating view over notifications.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub read: ReadFilter,
    /// Exact notification type, case-insensitive.
    pub kind: Option<String>,
    /// Case-insensitive substring over title and message.
    pub query: Option<String>,
}

impl NotificationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn read(mut self, read: ReadFilter) -> Self {
        self.read = read;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, notification: &RealtimeNotification) -> bool {
        let read_ok = match self.read {
            ReadFilter::All => true,
            ReadFilter::Read => notification.read,
            ReadFilter::Unread => !notification.read,
        };
        if !read_ok {
            return false;
        }

        if let Some(kind) = &self.kind
            && !notification.kind.eq_ignore_ascii_case(kind)
        {
            return false;
        }

        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                notification.title.to_lowercase().contains(&query)
                    || notification.message.to_lowercase().contains(&query)
            }
        }
    }
}

/// Notifications bucketed by local calendar date, each bucket newest-first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayGroups {
    pub today: Vec<RealtimeNotification>,
    pub yesterday: Vec<RealtimeNotification>,
    pub older: Vec<RealtimeNotification>,
}

impl DayGroups {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.yesterday.is_empty() && self.older.is_empty()
    }
}

/// Bucket by calendar date in `now`'s time zone. Timestamps ahead of `now`
/// (clock skew) count as today.
pub fn group_by_day<'a, Tz: TimeZone>(
    notifications: impl Iterator<Item = &'a RealtimeNotification>,
    now: &DateTime<Tz>,
) -> DayGroups {
    let tz = now.timezone();
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap_or(NaiveDate::MIN);

    let mut groups = DayGroups::default();
    for notification in notifications {
        let day = notification.created_at.with_timezone(&tz).date_naive();
        let bucket = if day >= today {
            &mut groups.today
        } else if day == yesterday {
            &mut groups.yesterday
        } else {
            &mut groups.older
        };
        bucket.push(notification.clone());
    }
    groups
}
