// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Event Store - keyed storage for opslog entries
//!
//! Records are partitioned by channel and sorted by `occurred_at` within a
//! partition. A secondary index maps each user to the keys they authored.
//! There is no global time-ordered index; callers that need one use
//! [`EventStore::scan_since`].

use async_trait::async_trait;
use opslog_core::{EventKey, EventRecord, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Store contract used by the retrieval engine and dispatcher.
///
/// Every call is a single round trip; implementations do not retry.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert or overwrite the record at its `(channel, occurred_at)` key.
    async fn put(&self, record: EventRecord) -> Result<()>;

    async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>>;

    /// Remove the record at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &EventKey) -> Result<()>;

    /// All records in a channel partition, ascending by `occurred_at`.
    async fn query_by_channel(&self, channel: &str) -> Result<Vec<EventRecord>>;

    /// All records authored by `user`, via the user index.
    async fn query_by_user(&self, user: &str) -> Result<Vec<EventRecord>>;

    /// Full scan filtered to `occurred_at >= threshold`.
    async fn scan_since(&self, threshold: i64) -> Result<Vec<EventRecord>>;
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub(crate) records: BTreeMap<EventKey, EventRecord>,
    pub(crate) by_user: HashMap<String, BTreeSet<EventKey>>,
}

impl Tables {
    pub(crate) fn from_records(records: impl IntoIterator<Item = EventRecord>) -> Self {
        let mut tables = Self::default();
        for record in records {
            tables.insert(record);
        }
        tables
    }

    pub(crate) fn insert(&mut self, record: EventRecord) {
        let key = record.key();
        // Same key, different author: drop the stale index entry
        let stale_user = self
            .records
            .get(&key)
            .filter(|previous| previous.user != record.user)
            .map(|previous| previous.user.clone());
        if let Some(user) = stale_user {
            self.unindex(&user, &key);
        }
        self.by_user
            .entry(record.user.clone())
            .or_default()
            .insert(key.clone());
        self.records.insert(key, record);
    }

    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<EventRecord> {
        let removed = self.records.remove(key)?;
        self.unindex(&removed.user, key);
        Some(removed)
    }

    fn unindex(&mut self, user: &str, key: &EventKey) {
        if let Some(keys) = self.by_user.get_mut(user) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_user.remove(user);
            }
        }
    }

    pub(crate) fn channel(&self, channel: &str) -> Vec<EventRecord> {
        let start = EventKey::new(channel, i64::MIN);
        self.records
            .range(start..)
            .take_while(|(k, _)| k.channel == channel)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub(crate) fn user(&self, user: &str) -> Vec<EventRecord> {
        self.by_user
            .get(user)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.records.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn since(&self, threshold: i64) -> Vec<EventRecord> {
        self.records
            .values()
            .filter(|r| r.occurred_at >= threshold)
            .cloned()
            .collect()
    }
}

/// In-process store, suitable for tests and single-node deployments that
/// accept losing history on restart.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    tables: RwLock<Tables>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = EventRecord>) -> Self {
        Self {
            tables: RwLock::new(Tables::from_records(records)),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn put(&self, record: EventRecord) -> Result<()> {
        self.tables.write().insert(record);
        Ok(())
    }

    async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>> {
        Ok(self.tables.read().records.get(key).cloned())
    }

    async fn delete(&self, key: &EventKey) -> Result<()> {
        self.tables.write().remove(key);
        Ok(())
    }

    async fn query_by_channel(&self, channel: &str) -> Result<Vec<EventRecord>> {
        Ok(self.tables.read().channel(channel))
    }

    async fn query_by_user(&self, user: &str) -> Result<Vec<EventRecord>> {
        Ok(self.tables.read().user(user))
    }

    async fn scan_since(&self, threshold: i64) -> Result<Vec<EventRecord>> {
        Ok(self.tables.read().since(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(channel: &str, user: &str, at: i64) -> EventRecord {
        EventRecord::build(channel, user, &format!("entry at {}", at), at)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryEventStore::new();
        let rec = record("ops", "alice", 100);
        store.put(rec.clone()).await.unwrap();

        assert_eq!(store.get(&rec.key()).await.unwrap(), Some(rec.clone()));

        store.delete(&rec.key()).await.unwrap();
        assert_eq!(store.get(&rec.key()).await.unwrap(), None);
        assert!(store.query_by_user("alice").await.unwrap().is_empty());

        // Deleting again is a no-op
        store.delete(&rec.key()).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_by_channel_stays_in_partition() {
        let store = MemoryEventStore::with_records(vec![
            record("ops", "alice", 3),
            record("ops", "bob", 1),
            record("ops-eu", "alice", 2),
            record("db", "carol", 5),
        ]);

        let ops = store.query_by_channel("ops").await.unwrap();
        let times: Vec<i64> = ops.iter().map(|r| r.occurred_at).collect();
        assert_eq!(times, vec![1, 3]);
        assert!(store.query_by_channel("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_by_user_crosses_channels() {
        let store = MemoryEventStore::with_records(vec![
            record("ops", "alice", 3),
            record("db", "alice", 7),
            record("ops", "bob", 4),
        ]);

        let alice = store.query_by_user("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.user == "alice"));
    }

    #[tokio::test]
    async fn test_overwrite_same_key_reindexes_user() {
        let store = MemoryEventStore::new();
        store.put(record("ops", "alice", 10)).await.unwrap();
        store.put(record("ops", "bob", 10)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.query_by_user("alice").await.unwrap().is_empty());
        assert_eq!(store.query_by_user("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_since_threshold_is_inclusive() {
        let store = MemoryEventStore::with_records(vec![
            record("ops", "alice", 10),
            record("db", "bob", 20),
            record("web", "carol", 30),
        ]);

        assert_eq!(store.scan_since(20).await.unwrap().len(), 2);
        assert_eq!(store.scan_since(31).await.unwrap().len(), 0);
        assert_eq!(store.scan_since(i64::MIN).await.unwrap().len(), 3);
    }
}
