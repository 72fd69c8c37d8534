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

//! Retrieval engine for opslog entries
//!
//! Three query shapes over an [`EventStore`]: latest N in a channel, latest
//! N across all channels, and latest by user (backing "delete last").

use opslog_core::{Clock, EventRecord, OpslogError, Result, ScanPolicy};
use opslog_storage::EventStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::merge::newest_first;

/// Query front-end over a shared store.
///
/// **Global queries:** the store has no time-ordered index spanning every
/// channel, so [`latest_global`](Self::latest_global) scans with a lookback
/// window that widens per the injected [`ScanPolicy`] until it has enough
/// records or the window passes the cap.
///
/// Cheap to clone; clones share the store and clock.
#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    policy: ScanPolicy,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>, policy: ScanPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Current time per the engine's clock, in Unix seconds.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Most recent `limit` entries in `channel`, newest first.
    pub async fn latest_by_channel(&self, channel: &str, limit: usize) -> Result<Vec<EventRecord>> {
        let records = self.store.query_by_channel(channel).await?;
        debug!(channel, fetched = records.len(), limit, "Channel query");
        Ok(newest_first(records, limit))
    }

    /// Most recent entry authored by `user`.
    pub async fn latest_by_user(&self, user: &str) -> Result<EventRecord> {
        let records = self.store.query_by_user(user).await?;
        newest_first(records, 1)
            .into_iter()
            .next()
            .ok_or_else(|| OpslogError::NotFound(format!("No opslog entries found for {}", user)))
    }

    /// Most recent `limit` entries across every channel, newest first.
    pub async fn latest_global(&self, limit: usize) -> Result<Vec<EventRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let mut window = self.policy.initial_window_secs;
        let mut scans = 0usize;

        let records = loop {
            let fetched = self.store.scan_since(now.saturating_sub(window)).await?;
            scans += 1;
            debug!(window, fetched = fetched.len(), limit, "Widening scan step");

            if fetched.len() >= limit || self.policy.exhausted(window) {
                break fetched;
            }
            window = self.policy.widen(window);
        };

        info!(scans, window, found = records.len(), limit, "Global query finished");
        Ok(newest_first(records, limit))
    }

    /// Delete the caller's most recent entry and return it.
    ///
    /// The returned record still carries its `ack_ref` so the caller can
    /// retract the acknowledgment message.
    pub async fn delete_own_last(&self, user: &str) -> Result<EventRecord> {
        let last = self.latest_by_user(user).await?;
        self.store.delete(&last.key()).await?;
        info!(
            user,
            channel = %last.channel,
            occurred_at = last.occurred_at,
            "Deleted latest opslog entry"
        );
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use opslog_core::{EventKey, FixedClock};
    use opslog_storage::MemoryEventStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000;

    fn rec(channel: &str, user: &str, at: i64) -> EventRecord {
        EventRecord::build(channel, user, &format!("{} at {}", channel, at), at)
    }

    /// Wraps a store and counts full scans.
    struct CountingStore {
        inner: MemoryEventStore,
        scans: AtomicUsize,
        thresholds: Mutex<Vec<i64>>,
    }

    impl CountingStore {
        fn new(records: Vec<EventRecord>) -> Self {
            Self {
                inner: MemoryEventStore::with_records(records),
                scans: AtomicUsize::new(0),
                thresholds: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventStore for CountingStore {
        async fn put(&self, record: EventRecord) -> Result<()> {
            self.inner.put(record).await
        }
        async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>> {
            self.inner.get(key).await
        }
        async fn delete(&self, key: &EventKey) -> Result<()> {
            self.inner.delete(key).await
        }
        async fn query_by_channel(&self, channel: &str) -> Result<Vec<EventRecord>> {
            self.inner.query_by_channel(channel).await
        }
        async fn query_by_user(&self, user: &str) -> Result<Vec<EventRecord>> {
            self.inner.query_by_user(user).await
        }
        async fn scan_since(&self, threshold: i64) -> Result<Vec<EventRecord>> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.thresholds.lock().unwrap().push(threshold);
            self.inner.scan_since(threshold).await
        }
    }

    /// Store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn put(&self, _record: EventRecord) -> Result<()> {
            Err(OpslogError::store("unavailable"))
        }
        async fn get(&self, _key: &EventKey) -> Result<Option<EventRecord>> {
            Err(OpslogError::store("unavailable"))
        }
        async fn delete(&self, _key: &EventKey) -> Result<()> {
            Err(OpslogError::store("unavailable"))
        }
        async fn query_by_channel(&self, _channel: &str) -> Result<Vec<EventRecord>> {
            Err(OpslogError::store("unavailable"))
        }
        async fn query_by_user(&self, _user: &str) -> Result<Vec<EventRecord>> {
            Err(OpslogError::store("unavailable"))
        }
        async fn scan_since(&self, _threshold: i64) -> Result<Vec<EventRecord>> {
            Err(OpslogError::store("unavailable"))
        }
    }

    fn engine_with(store: Arc<dyn EventStore>, policy: ScanPolicy) -> RetrievalEngine {
        RetrievalEngine::new(store, Arc::new(FixedClock::new(NOW)), policy)
    }

    #[tokio::test]
    async fn test_show_defaults_to_ten_most_recent() {
        let records: Vec<EventRecord> = (0..15).map(|i| rec("ops", "alice", NOW - 100 + i)).collect();
        let engine = engine_with(
            Arc::new(MemoryEventStore::with_records(records)),
            ScanPolicy::default(),
        );

        let latest = engine.latest_by_channel("ops", 10).await.unwrap();
        assert_eq!(latest.len(), 10);
        assert_eq!(latest[0].occurred_at, NOW - 86);
        assert_eq!(latest[9].occurred_at, NOW - 95);
        assert!(latest.windows(2).all(|w| w[0].occurred_at > w[1].occurred_at));
    }

    #[tokio::test]
    async fn test_latest_by_channel_fewer_than_limit() {
        let engine = engine_with(
            Arc::new(MemoryEventStore::with_records(vec![
                rec("ops", "alice", 1),
                rec("db", "bob", 2),
            ])),
            ScanPolicy::default(),
        );

        let latest = engine.latest_by_channel("ops", 10).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].channel, "ops");
        assert!(engine.latest_by_channel("web", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_by_user_picks_newest_across_channels() {
        let engine = engine_with(
            Arc::new(MemoryEventStore::with_records(vec![
                rec("ops", "alice", 10),
                rec("db", "alice", 30),
                rec("web", "bob", 40),
            ])),
            ScanPolicy::default(),
        );

        let last = engine.latest_by_user("alice").await.unwrap();
        assert_eq!(last.channel, "db");
        assert_eq!(last.occurred_at, 30);
    }

    #[tokio::test]
    async fn test_latest_by_user_not_found() {
        let engine = engine_with(Arc::new(MemoryEventStore::new()), ScanPolicy::default());
        let err = engine.latest_by_user("nobody").await.unwrap_err();
        assert!(matches!(err, OpslogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_own_last_removes_only_newest() {
        let store = Arc::new(MemoryEventStore::with_records(vec![
            rec("ops", "alice", 10),
            rec("ops", "alice", 20),
        ]));
        let engine = engine_with(store.clone(), ScanPolicy::default());

        let deleted = engine.delete_own_last("alice").await.unwrap();
        assert_eq!(deleted.occurred_at, 20);
        assert_eq!(store.len(), 1);
        assert_eq!(engine.latest_by_user("alice").await.unwrap().occurred_at, 10);
    }

    #[tokio::test]
    async fn test_delete_own_last_without_entries_mutates_nothing() {
        let store = Arc::new(MemoryEventStore::with_records(vec![rec("ops", "bob", 10)]));
        let engine = engine_with(store.clone(), ScanPolicy::default());

        let err = engine.delete_own_last("alice").await.unwrap_err();
        assert!(matches!(err, OpslogError::NotFound(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_global_stops_at_first_sufficient_window() {
        let store = Arc::new(CountingStore::new(vec![
            rec("ops", "alice", NOW - 5),
            rec("db", "bob", NOW - 8),
            rec("web", "carol", NOW - 30),
        ]));
        let policy = ScanPolicy::new(10, 2, 1_000).unwrap();
        let engine = engine_with(store.clone(), policy);

        let latest = engine.latest_global(2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].channel, "ops");
        assert_eq!(latest[1].channel, "db");
        assert_eq!(store.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_global_widens_until_enough() {
        let store = Arc::new(CountingStore::new(vec![
            rec("ops", "alice", NOW - 5),
            rec("db", "bob", NOW - 35),
            rec("web", "carol", NOW - 70),
        ]));
        let policy = ScanPolicy::new(10, 2, 1_000).unwrap();
        let engine = engine_with(store.clone(), policy);

        let latest = engine.latest_global(3).await.unwrap();
        assert_eq!(latest.len(), 3);
        let times: Vec<i64> = latest.iter().map(|r| r.occurred_at).collect();
        assert_eq!(times, vec![NOW - 5, NOW - 35, NOW - 70]);

        // windows 10, 20, 40, 80
        assert_eq!(store.scans.load(Ordering::SeqCst), 4);
        assert_eq!(
            *store.thresholds.lock().unwrap(),
            vec![NOW - 10, NOW - 20, NOW - 40, NOW - 80]
        );
    }

    #[tokio::test]
    async fn test_global_terminates_when_history_is_short() {
        let store = Arc::new(CountingStore::new(vec![
            rec("ops", "alice", NOW - 5),
            rec("db", "bob", NOW - 500),
        ]));
        let policy = ScanPolicy::new(10, 2, 50).unwrap();
        let engine = engine_with(store.clone(), policy);

        let latest = engine.latest_global(10).await.unwrap();
        // window 80 is past the cap, so the record at NOW - 500 is never reached
        assert_eq!(latest.len(), 1);
        // windows 10, 20, 40, 80
        assert_eq!(store.scans.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_global_default_policy_on_empty_store() {
        let store = Arc::new(CountingStore::new(vec![]));
        let engine = engine_with(store.clone(), ScanPolicy::default());

        assert!(engine.latest_global(10).await.unwrap().is_empty());
        assert_eq!(store.scans.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_global_zero_limit_skips_scan() {
        let store = Arc::new(CountingStore::new(vec![rec("ops", "alice", NOW)]));
        let engine = engine_with(store.clone(), ScanPolicy::default());

        assert!(engine.latest_global(0).await.unwrap().is_empty());
        assert_eq!(store.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failures_propagate_unchanged() {
        let engine = engine_with(Arc::new(BrokenStore), ScanPolicy::default());

        assert_eq!(
            engine.latest_by_channel("ops", 10).await.unwrap_err(),
            OpslogError::store("unavailable")
        );
        assert_eq!(
            engine.latest_global(5).await.unwrap_err(),
            OpslogError::store("unavailable")
        );
        assert_eq!(
            engine.delete_own_last("alice").await.unwrap_err(),
            OpslogError::store("unavailable")
        );
    }
}
