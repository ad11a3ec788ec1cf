// src/engine/mod.rs

//! Orchestration engine for watchhook.
//!
//! - [`core`] holds the pure per-entry decision (detect + plan), with no IO.
//! - [`cycle`] runs one poll cycle: fetch, decide, dispatch, commit, fanned
//!   out over entries with bounded parallelism.
//! - [`runtime`] is the async shell acting as the scheduler: it reacts to
//!   ticks, manual run requests and shutdown, and lets cycles overlap.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::metadata::FetchError;
use crate::notify::FailureReason;
use crate::types::RemoteTimestamp;
use crate::watch::WatchId;

pub mod core;
pub mod cycle;
pub mod runtime;

pub use self::core::{plan_entry, EntryPlan};
pub use cycle::PollCycle;
pub use runtime::{spawn_ticker, Runtime};

pub type CycleId = u64;

/// Per-cycle context threaded through fetch, detect and dispatch.
///
/// Overlapping cycles each carry their own value; nothing about "the current
/// poll" is process-wide.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub cycle_id: CycleId,
    /// Dispatch for every entry, whether or not a change was detected.
    pub force: bool,
    pub started_at: DateTime<Utc>,
}

impl CycleContext {
    pub fn new(cycle_id: CycleId, force: bool) -> Self {
        Self {
            cycle_id,
            force,
            started_at: Utc::now(),
        }
    }
}

/// Limits applied inside a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Upper bound for one metadata fetch.
    pub fetch_timeout: Duration,
    /// Upper bound for one webhook call.
    pub dispatch_timeout: Duration,
    /// Entries processed concurrently within one cycle.
    pub max_concurrency: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            dispatch_timeout: Duration::from_secs(60),
            max_concurrency: 8,
        }
    }
}

/// What happened to one entry in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Nothing new since the cursor.
    Unchanged,
    /// Webhook delivered and cursor advanced to `cursor`.
    Notified { cursor: RemoteTimestamp },
    /// Webhook delivered, but another cycle had already moved the cursor.
    Superseded { actual: Option<RemoteTimestamp> },
    /// Change detected, but the entry has no webhook configured.
    NoWebhook,
    FetchFailed(FetchError),
    DispatchFailed(FailureReason),
    /// Webhook delivered but the store could not record it.
    CommitFailed(String),
}

/// Results of one finished cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    /// One result per processed entry, sorted by watch id.
    pub results: Vec<(WatchId, EntryOutcome)>,
    /// Entry tasks that panicked or were cancelled.
    pub aborted: usize,
}

impl CycleReport {
    pub fn new(cycle_id: CycleId) -> Self {
        Self {
            cycle_id,
            ..Self::default()
        }
    }

    pub fn outcome_of(&self, id: &str) -> Option<&EntryOutcome> {
        self.results
            .iter()
            .find(|(watch, _)| watch == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.results.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn notified(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Notified { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                EntryOutcome::FetchFailed(_)
                    | EntryOutcome::DispatchFailed(_)
                    | EntryOutcome::CommitFailed(_)
            )
        })
    }
}

/// Runtime options used by the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once no cycle is in flight (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the ticker, the CLI and signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Periodic scheduler tick: start a regular cycle.
    Tick,
    /// Start a cycle now (e.g. `--once`, `--force`).
    RunRequested { force: bool },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}
