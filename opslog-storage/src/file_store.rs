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

//! JSON-file backed event store
//!
//! Keeps the same in-memory tables as [`MemoryEventStore`] and rewrites the
//! whole file on every mutation (temp file + rename). The in-memory state is
//! only replaced after the file write succeeds, so a failed write leaves both
//! sides on the previous version.
//!
//! [`MemoryEventStore`]: crate::MemoryEventStore

use async_trait::async_trait;
use opslog_core::{EventKey, EventRecord, OpslogError, Result};
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::event_store::{EventStore, Tables};

pub struct FileEventStore {
    tables: RwLock<Tables>,
    path: PathBuf,
}

impl FileEventStore {
    /// Open the store at `path`, loading existing records if the file exists.
    ///
    /// A file that cannot be parsed is an error rather than silently starting
    /// empty; the next write would otherwise destroy the history.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let file = File::open(&path).map_err(|e| {
                OpslogError::store(format!("failed to open {}: {}", path.display(), e))
            })?;
            let records: Vec<EventRecord> = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| {
                    OpslogError::store(format!("failed to parse {}: {}", path.display(), e))
                })?;
            info!("Loaded {} opslog entries from {:?}", records.len(), path);
            records
        } else {
            info!("Opslog data file {:?} not found, starting empty", path);
            Vec::new()
        };

        Ok(Self {
            tables: RwLock::new(Tables::from_records(records)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    OpslogError::store(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path).map_err(|e| {
                OpslogError::store(format!("failed to create {}: {}", temp_path.display(), e))
            })?;
            let records: Vec<&EventRecord> = tables.records.values().collect();
            serde_json::to_writer_pretty(BufWriter::new(file), &records)
                .map_err(|e| OpslogError::store(format!("failed to serialize entries: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            warn!("Failed to move {:?} into place: {}", temp_path, e);
            OpslogError::store(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        debug!("Persisted {} opslog entries", tables.records.len());
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut Tables)) -> Result<()> {
        let mut tables = self.tables.write();
        let mut next = tables.clone();
        apply(&mut next);
        self.save(&next)?;
        *tables = next;
        Ok(())
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn put(&self, record: EventRecord) -> Result<()> {
        self.mutate(|tables| tables.insert(record))
    }

    async fn get(&self, key: &EventKey) -> Result<Option<EventRecord>> {
        Ok(self.tables.read().records.get(key).cloned())
    }

    async fn delete(&self, key: &EventKey) -> Result<()> {
        if !self.tables.read().records.contains_key(key) {
            return Ok(());
        }
        self.mutate(|tables| {
            tables.remove(key);
        })
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("opslog.json");

        {
            let store = FileEventStore::open(&path).unwrap();
            let mut rec = EventRecord::build("ops", "alice", "failover #db:main", 1000);
            store.put(rec.clone()).await.unwrap();

            rec.ack_ref = "1000.0001".to_string();
            store.put(rec).await.unwrap();
            store
                .put(EventRecord::build("web", "bob", "cache flush", 2000))
                .await
                .unwrap();
        }

        let reopened = FileEventStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);

        let alice = reopened.query_by_user("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].ack_ref, "1000.0001");
        assert_eq!(alice[0].tags, vec!["db:main"]);
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("opslog.json");

        let store = FileEventStore::open(&path).unwrap();
        let rec = EventRecord::build("ops", "alice", "x", 5);
        store.put(rec.clone()).await.unwrap();
        store.delete(&rec.key()).await.unwrap();

        let reopened = FileEventStore::open(&path).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("opslog.json");
        fs::write(&path, "not json").unwrap();

        let err = FileEventStore::open(&path).err().unwrap();
        assert!(matches!(err, OpslogError::Store(_)));
    }
}
