// src/watch/entry.rs

use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::RemoteTimestamp;

/// Canonical watch identifier (the `<id>` in `[watch.<id>]`).
pub type WatchId = String;

/// One registration of interest in a repository/project pair.
///
/// Values of this type are snapshots: stores hand out clones and only change
/// their own copy through [`EntryUpdate`] (cursor) or a poll-time touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub id: WatchId,
    pub repo_id: String,
    pub project_id: String,
    pub webhook_url_template: String,
    pub enabled: bool,
    /// Most recent remote modification time that was successfully delivered.
    pub last_observed_modified: Option<RemoteTimestamp>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_notify_at: Option<DateTime<Utc>>,
}

impl WatchEntry {
    pub fn new(
        id: impl Into<WatchId>,
        repo_id: impl Into<String>,
        project_id: impl Into<String>,
        webhook_url_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            repo_id: repo_id.into(),
            project_id: project_id.into(),
            webhook_url_template: webhook_url_template.into(),
            enabled: true,
            last_observed_modified: None,
            last_poll_at: None,
            last_notify_at: None,
        }
    }

    /// Entries with an empty template are polled but never notified.
    pub fn has_webhook(&self) -> bool {
        !self.webhook_url_template.trim().is_empty()
    }

    /// Build the cursor advance for a delivered notification of `modified`.
    ///
    /// The expected value is this snapshot's cursor. The next value never
    /// moves backwards, even for a forced delivery of an older modification.
    pub fn delivered(&self, modified: RemoteTimestamp, notified_at: DateTime<Utc>) -> EntryUpdate {
        let next = match self.last_observed_modified {
            Some(cursor) if cursor > modified => cursor,
            _ => modified,
        };
        EntryUpdate {
            id: self.id.clone(),
            expected: self.last_observed_modified,
            next,
            notified_at,
        }
    }
}

impl fmt::Display for WatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Watch {}:{}/{}>", self.id, self.repo_id, self.project_id)
    }
}

/// Next-state value for a cursor advance, applied by a store with
/// compare-and-set on `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub id: WatchId,
    pub expected: Option<RemoteTimestamp>,
    pub next: RemoteTimestamp,
    pub notified_at: DateTime<Utc>,
}

impl EntryUpdate {
    /// Whether `current` is the cursor this update was computed against.
    pub fn matches(&self, current: Option<RemoteTimestamp>) -> bool {
        self.expected == current
    }

    /// Produce the successor of `entry` (which must be the matching snapshot).
    pub fn apply_to(&self, entry: &WatchEntry) -> WatchEntry {
        WatchEntry {
            last_observed_modified: Some(self.next),
            last_notify_at: Some(self.notified_at),
            ..entry.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: i64) -> RemoteTimestamp {
        RemoteTimestamp::from_millis(ms)
    }

    #[test]
    fn delivered_expects_current_cursor() {
        let mut entry = WatchEntry::new("w", "repo", "proj", "http://hook");
        entry.last_observed_modified = Some(ts(5));
        let now = Utc::now();

        let update = entry.delivered(ts(9), now);

        assert_eq!(update.expected, Some(ts(5)));
        assert_eq!(update.next, ts(9));
        assert!(update.matches(Some(ts(5))));
        assert!(!update.matches(None));
    }

    #[test]
    fn delivered_never_rolls_cursor_back() {
        let mut entry = WatchEntry::new("w", "repo", "proj", "http://hook");
        entry.last_observed_modified = Some(ts(20));

        let update = entry.delivered(ts(10), Utc::now());

        assert_eq!(update.next, ts(20));
    }

    #[test]
    fn apply_to_only_touches_cursor_and_notify_time() {
        let entry = WatchEntry::new("w", "repo", "proj", "http://hook");
        let now = Utc::now();
        let next = entry.delivered(ts(1), now).apply_to(&entry);

        assert_eq!(next.last_observed_modified, Some(ts(1)));
        assert_eq!(next.last_notify_at, Some(now));
        assert_eq!(next.last_poll_at, None);
        assert_eq!(next.webhook_url_template, entry.webhook_url_template);
    }

    #[test]
    fn empty_template_has_no_webhook() {
        assert!(!WatchEntry::new("w", "r", "p", "  ").has_webhook());
        assert!(WatchEntry::new("w", "r", "p", "http://x").has_webhook());
    }
}
