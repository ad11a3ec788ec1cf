// src/store/memory.rs

//! In-memory implementation of the [`WatchStore`] port.
//!
//! Cursor checks and writes happen under a single write lock, which makes
//! `compare_and_set` atomic per entry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::{CasOutcome, StoreError, WatchStore};
use crate::watch::{EntryUpdate, WatchEntry, WatchId};

#[derive(Debug, Default)]
pub struct MemoryWatchStore {
    entries: RwLock<BTreeMap<WatchId, WatchEntry>>,
}

impl MemoryWatchStore {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = WatchEntry>,
    {
        let entries = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Snapshot of a single entry.
    pub async fn get(&self, id: &str) -> Option<WatchEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Operator-side toggle; disabled entries are skipped by poll cycles.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntry(id.to_string()))?;
        entry.enabled = enabled;
        Ok(())
    }
}

#[async_trait]
impl WatchStore for MemoryWatchStore {
    async fn list_all(&self) -> Result<Vec<WatchEntry>, StoreError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn compare_and_set(&self, update: &EntryUpdate) -> Result<CasOutcome, StoreError> {
        let mut guard = self.entries.write().await;
        let current = guard
            .get(&update.id)
            .ok_or_else(|| StoreError::UnknownEntry(update.id.clone()))?;

        if !update.matches(current.last_observed_modified) {
            debug!(
                watch = %update.id,
                expected = ?update.expected,
                actual = ?current.last_observed_modified,
                "cursor compare-and-set conflict"
            );
            return Ok(CasOutcome::Conflict {
                actual: current.last_observed_modified,
            });
        }

        let next = update.apply_to(current);
        info!(watch = %update.id, cursor = %update.next, "advanced cursor (memory)");
        guard.insert(update.id.clone(), next);
        Ok(CasOutcome::Applied)
    }

    async fn touch_poll_time(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEntry(id.to_string()))?;
        entry.last_poll_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteTimestamp;

    fn ts(ms: i64) -> RemoteTimestamp {
        RemoteTimestamp::from_millis(ms)
    }

    fn store_with_one() -> (MemoryWatchStore, WatchEntry) {
        let entry = WatchEntry::new("site", "repo", "proj", "http://hook/{project_id}");
        (MemoryWatchStore::new([entry.clone()]), entry)
    }

    #[tokio::test]
    async fn compare_and_set_applies_on_matching_cursor() {
        let (store, entry) = store_with_one();
        let update = entry.delivered(ts(100), Utc::now());

        let outcome = store.compare_and_set(&update).await.unwrap();

        assert_eq!(outcome, CasOutcome::Applied);
        let stored = store.get("site").await.unwrap();
        assert_eq!(stored.last_observed_modified, Some(ts(100)));
        assert!(stored.last_notify_at.is_some());
    }

    #[tokio::test]
    async fn compare_and_set_conflicts_on_stale_snapshot() {
        let (store, entry) = store_with_one();
        store
            .compare_and_set(&entry.delivered(ts(100), Utc::now()))
            .await
            .unwrap();

        // Same stale snapshot, later modification.
        let outcome = store
            .compare_and_set(&entry.delivered(ts(200), Utc::now()))
            .await
            .unwrap();

        assert_eq!(outcome, CasOutcome::Conflict { actual: Some(ts(100)) });
        let stored = store.get("site").await.unwrap();
        assert_eq!(stored.last_observed_modified, Some(ts(100)));
    }

    #[tokio::test]
    async fn concurrent_compare_and_set_has_exactly_one_winner() {
        let (store, entry) = store_with_one();
        let a = entry.delivered(ts(100), Utc::now());
        let b = entry.delivered(ts(100), Utc::now());

        let (ra, rb) = tokio::join!(store.compare_and_set(&a), store.compare_and_set(&b));
        let outcomes = [ra.unwrap(), rb.unwrap()];

        let applied = outcomes.iter().filter(|o| **o == CasOutcome::Applied).count();
        assert_eq!(applied, 1, "exactly one should win: {outcomes:?}");
        assert!(outcomes.contains(&CasOutcome::Conflict { actual: Some(ts(100)) }));
    }

    #[tokio::test]
    async fn list_enabled_skips_disabled_entries() {
        let (store, _) = store_with_one();
        store.set_enabled("site", false).await.unwrap();

        assert!(store.list_enabled().await.unwrap().is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn touch_poll_time_leaves_cursor_alone() {
        let (store, _) = store_with_one();
        let now = Utc::now();

        store.touch_poll_time("site", now).await.unwrap();

        let stored = store.get("site").await.unwrap();
        assert_eq!(stored.last_poll_at, Some(now));
        assert_eq!(stored.last_observed_modified, None);
    }

    #[tokio::test]
    async fn unknown_entry_is_an_error() {
        let (store, _) = store_with_one();
        let result = store.touch_poll_time("missing", Utc::now()).await;
        assert!(matches!(result, Err(StoreError::UnknownEntry(id)) if id == "missing"));
    }
}
