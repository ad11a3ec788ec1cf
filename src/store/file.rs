// src/store/file.rs

//! [`WatchStore`] that persists cursors to a plain-text state file.
//!
//! Watch definitions (repo, project, template, enabled) come from the config
//! file; only the mutable part of each entry lives in the state file, one
//! line per entry:
//!
//! ```text
//! <watch-id> <last_observed_modified|-> <last_poll_at|-> <last_notify_at|->
//! ```
//!
//! Timestamps are RFC 3339 in UTC; the cursor is the raw millisecond value.
//! Every write goes through a temporary file + rename. Cursor advances are
//! written before they become visible; poll-time touches are buffered until
//! [`WatchStore::flush`] or the next cursor write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::memory::MemoryWatchStore;
use crate::store::{CasOutcome, StoreError, WatchStore};
use crate::types::RemoteTimestamp;
use crate::watch::{EntryUpdate, WatchEntry, WatchId};

const EMPTY_FIELD: &str = "-";

/// Persisted mutable state of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CursorRecord {
    last_observed_modified: Option<RemoteTimestamp>,
    last_poll_at: Option<DateTime<Utc>>,
    last_notify_at: Option<DateTime<Utc>>,
}

pub struct FileWatchStore {
    path: PathBuf,
    inner: MemoryWatchStore,
    // Serialises "mutate + rewrite file" so the file never lags a newer write.
    write_lock: Mutex<()>,
    // Touches applied in memory but not yet written.
    dirty: AtomicBool,
}

impl std::fmt::Debug for FileWatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatchStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileWatchStore {
    /// Open the state file at `path` and merge its cursors into the
    /// configured entries.
    ///
    /// Records for watch ids that are no longer configured are pruned and the
    /// file is rewritten.
    pub fn open(path: impl Into<PathBuf>, configured: Vec<WatchEntry>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = load_records(&path)?;
        let initial_len = records.len();

        let entries: Vec<WatchEntry> = configured
            .into_iter()
            .map(|entry| match records.remove(&entry.id) {
                Some(record) => WatchEntry {
                    last_observed_modified: record.last_observed_modified,
                    last_poll_at: record.last_poll_at,
                    last_notify_at: record.last_notify_at,
                    ..entry
                },
                None => entry,
            })
            .collect();

        if !records.is_empty() {
            info!(
                removed = records.len(),
                kept = initial_len - records.len(),
                "pruned stale watch cursors (file)"
            );
            write_atomic_sync(&path, &render_records(&entries))?;
        }

        debug!(path = ?path, entries = entries.len(), "opened cursor state file");

        Ok(Self {
            path,
            inner: MemoryWatchStore::new(entries),
            write_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &[WatchEntry]) -> Result<(), StoreError> {
        let contents = render_records(entries);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| backend(format!("creating state directory {parent:?}"), e))?;
            }
        }

        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| backend(format!("writing state file {tmp:?}"), e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| backend(format!("replacing state file {:?}", self.path), e))?;
        Ok(())
    }
}

#[async_trait]
impl WatchStore for FileWatchStore {
    async fn list_all(&self) -> Result<Vec<WatchEntry>, StoreError> {
        self.inner.list_all().await
    }

    async fn compare_and_set(&self, update: &EntryUpdate) -> Result<CasOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.inner.list_all().await?;
        let current = entries
            .iter_mut()
            .find(|e| e.id == update.id)
            .ok_or_else(|| StoreError::UnknownEntry(update.id.clone()))?;
        if !update.matches(current.last_observed_modified) {
            return Ok(CasOutcome::Conflict {
                actual: current.last_observed_modified,
            });
        }

        // The file must hold the new cursor before anyone can read it.
        *current = update.apply_to(current);
        self.persist(&entries).await?;
        self.dirty.store(false, Ordering::SeqCst);

        self.inner.compare_and_set(update).await
    }

    async fn touch_poll_time(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.inner.touch_poll_time(id, at).await?;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let entries = self.inner.list_all().await?;
        if let Err(e) = self.persist(&entries).await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }
        debug!(path = ?self.path, "flushed poll times");
        Ok(())
    }
}

fn backend(context: String, err: std::io::Error) -> StoreError {
    StoreError::Backend(format!("{context}: {err}"))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn load_records(path: &Path) -> Result<HashMap<WatchId, CursorRecord>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| backend(format!("reading state file {path:?}"), e))?;

    let mut records = HashMap::new();
    for (lineno, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_record(trimmed) {
            Some((id, record)) => {
                records.insert(id, record);
            }
            None => {
                warn!(path = ?path, line = lineno + 1, "ignoring malformed cursor record");
            }
        }
    }
    Ok(records)
}

fn parse_record(line: &str) -> Option<(WatchId, CursorRecord)> {
    let mut fields = line.split_whitespace();
    let id = fields.next()?.to_string();
    let cursor = optional(fields.next()?, |s| s.parse::<RemoteTimestamp>().ok())?;
    let last_poll_at = optional(fields.next()?, parse_time)?;
    let last_notify_at = optional(fields.next()?, parse_time)?;
    Some((
        id,
        CursorRecord {
            last_observed_modified: cursor,
            last_poll_at,
            last_notify_at,
        },
    ))
}

/// `-` is an absent value; anything else must parse.
fn optional<T>(field: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Option<T>> {
    if field == EMPTY_FIELD {
        Some(None)
    } else {
        parse(field).map(Some)
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn format_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| EMPTY_FIELD.to_string())
}

fn render_records(entries: &[WatchEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let cursor = entry
            .last_observed_modified
            .map(|c| c.to_string())
            .unwrap_or_else(|| EMPTY_FIELD.to_string());
        out.push_str(&format!(
            "{} {} {} {}\n",
            entry.id,
            cursor,
            format_time(entry.last_poll_at),
            format_time(entry.last_notify_at)
        ));
    }
    out
}

fn write_atomic_sync(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| backend(format!("creating state directory {parent:?}"), e))?;
        }
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, contents).map_err(|e| backend(format!("writing state file {tmp:?}"), e))?;
    fs::rename(&tmp, path).map_err(|e| backend(format!("replacing state file {path:?}"), e))
}
