// src/store/mod.rs

//! Durable storage for watch entries and their cursors.
//!
//! The store is the only shared mutable resource of the service. Cursor
//! advances go through [`WatchStore::compare_and_set`] so that overlapping
//! poll cycles cannot both commit the same modification. Poll-time touches
//! carry no correctness obligation and are applied without a check.
//!
//! - [`memory`] keeps everything in a map (tests, `store = "memory"`).
//! - [`file`] wraps the memory store and persists cursors to a state file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::RemoteTimestamp;
use crate::watch::{EntryUpdate, WatchEntry};

pub mod file;
pub mod memory;

pub use file::FileWatchStore;
pub use memory::MemoryWatchStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown watch entry: {0}")]
    UnknownEntry(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result of a compare-and-set on an entry's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The stored cursor no longer matched the expected value.
    Conflict { actual: Option<RemoteTimestamp> },
}

#[async_trait]
pub trait WatchStore: Send + Sync {
    /// All entries, enabled or not.
    async fn list_all(&self) -> Result<Vec<WatchEntry>, StoreError>;

    /// Entries a poll cycle should visit.
    async fn list_enabled(&self) -> Result<Vec<WatchEntry>, StoreError> {
        let entries = self.list_all().await?;
        Ok(entries.into_iter().filter(|e| e.enabled).collect())
    }

    /// Advance the cursor of `update.id` to `update.next` iff it still equals
    /// `update.expected`.
    async fn compare_and_set(&self, update: &EntryUpdate) -> Result<CasOutcome, StoreError>;

    /// Record that the entry was polled at `at`. Backends may buffer this
    /// until [`WatchStore::flush`].
    async fn touch_poll_time(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Write out buffered poll-time touches. Called once at the end of every
    /// poll cycle.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
