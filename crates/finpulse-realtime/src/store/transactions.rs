//! Live transaction feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::{Ingest, Keyed, OrderedStore};

/// A transaction pushed over the live connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeTransaction {
    /// Stable across reconnects; used for dedup.
    pub id: String,
    pub amount_cents: i64,
    pub is_income: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set on first arrival, cleared by `mark_seen`.
    #[serde(skip_deserializing)]
    pub is_new: bool,
}

impl Keyed for RealtimeTransaction {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Most-recent-first, id-unique feed of live transactions.
///
/// Nothing is ever evicted automatically; `clear_old` is the only way the
/// feed shrinks.
#[derive(Clone, Debug, Default)]
pub struct TransactionFeed {
    entries: OrderedStore<RealtimeTransaction>,
}

impl TransactionFeed {
    /// Add a transaction. A known id updates the existing entry in place
    /// and keeps its `is_new` flag, so a replay after reconnect does not
    /// resurface an already-seen transaction.
    pub fn ingest(&mut self, mut tx: RealtimeTransaction) -> Ingest {
        tx.is_new = true;
        self.entries.upsert_in_place(tx, |existing, incoming| {
            let is_new = existing.is_new;
            *existing = incoming;
            existing.is_new = is_new;
        })
    }

    /// Clear `is_new` on every entry. Returns how many changed.
    pub fn mark_seen(&mut self) -> usize {
        let mut changed = 0;
        for tx in self.entries.values_mut().filter(|tx| tx.is_new) {
            tx.is_new = false;
            changed += 1;
        }
        changed
    }

    /// Keep the `retain` most recent entries. Returns how many were dropped.
    pub fn clear_old(&mut self, retain: usize) -> usize {
        self.entries.retain_newest(retain)
    }

    pub fn get(&self, id: &str) -> Option<&RealtimeTransaction> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RealtimeTransaction> {
        self.entries.iter_newest_first()
    }

    pub fn recent(&self) -> Vec<RealtimeTransaction> {
        self.entries.to_vec_newest_first()
    }

    pub fn new_count(&self) -> usize {
        self.iter().filter(|tx| tx.is_new).count()
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
    use std::collections::HashSet;

    use chrono::TimeZone;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn tx(id: &str, amount_cents: i64) -> RealtimeTransaction {
        RealtimeTransaction {
            id: id.to_string(),
            amount_cents,
            is_income: false,
            description: None,
            category: Some("groceries".to_string()),
            merchant: Some("Corner Shop".to_string()),
            account_id: None,
            account_name: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            is_new: false,
        }
    }

    fn ids(feed: &TransactionFeed) -> Vec<String> {
        feed.iter().map(|tx| tx.id.clone()).collect()
    }

    #[test]
    fn ingest_prepends_and_flags_new() {
        let mut feed = TransactionFeed::default();
        assert_eq!(feed.ingest(tx("t1", 100)), Ingest::Inserted);
        assert_eq!(feed.ingest(tx("t2", 200)), Ingest::Inserted);

        assert_eq!(ids(&feed), vec!["t2", "t1"]);
        assert!(feed.iter().all(|tx| tx.is_new));
        assert_eq!(feed.new_count(), 2);
    }

    #[test]
    fn duplicate_updates_fields_in_place() {
        let mut feed = TransactionFeed::default();
        feed.ingest(tx("t1", 100));
        feed.ingest(tx("t2", 200));
        feed.ingest(tx("t3", 300));

        let mut updated = tx("t2", 250);
        updated.merchant = Some("Renamed".to_string());
        assert_eq!(feed.ingest(updated), Ingest::Replaced);

        assert_eq!(ids(&feed), vec!["t3", "t2", "t1"]);
        let entry = feed.get("t2").expect("t2 present");
        assert_eq!(entry.amount_cents, 250);
        assert_eq!(entry.merchant.as_deref(), Some("Renamed"));
    }

    #[test]
    fn replay_of_seen_transaction_stays_seen() {
        let mut feed = TransactionFeed::default();
        feed.ingest(tx("t1", 100));
        feed.mark_seen();
        feed.ingest(tx("t1", 100));
        assert!(!feed.get("t1").expect("present").is_new);
        assert_eq!(feed.new_count(), 0);
    }

    #[test]
    fn random_ingest_sequences_never_duplicate() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut feed = TransactionFeed::default();
            for _ in 0..200 {
                let id = format!("t{}", rng.random_range(0..40));
                feed.ingest(tx(&id, rng.random_range(1..10_000)));
            }
            let unique: HashSet<_> = feed.iter().map(|tx| tx.id.as_str()).collect();
            assert_eq!(unique.len(), feed.len());
        }
    }

    #[test]
    fn mark_seen_then_clear_old() {
        let mut feed = TransactionFeed::default();
        for n in 1..=25 {
            feed.ingest(tx(&format!("tx{n}"), n));
        }
        assert_eq!(feed.new_count(), 25);

        assert_eq!(feed.mark_seen(), 25);
        assert!(feed.iter().all(|tx| !tx.is_new));

        assert_eq!(feed.clear_old(20), 5);
        assert_eq!(feed.len(), 20);
        assert!(feed.iter().all(|tx| !tx.is_new));
        let expected: Vec<String> = (6..=25).rev().map(|n| format!("tx{n}")).collect();
        assert_eq!(ids(&feed), expected);
    }

    #[test]
    fn clear_old_on_small_feed_is_noop() {
        let mut feed = TransactionFeed::default();
        feed.ingest(tx("t1", 1));
        assert_eq!(feed.clear_old(20), 0);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn deserializes_wire_payload() {
        let json = r#"{
            "id": "tx_1",
            "amountCents": -4599,
            "isIncome": false,
            "merchant": "Grocer",
            "createdAt": "2024-05-01T10:00:00Z",
            "isNew": false
        }"#;
        let tx: RealtimeTransaction = serde_json::from_str(json).expect("valid payload");
        assert_eq!(tx.id, "tx_1");
        assert_eq!(tx.amount_cents, -4599);
        assert_eq!(tx.merchant.as_deref(), Some("Grocer"));
        assert!(tx.category.is_none());
    }
}
