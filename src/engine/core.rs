// src/engine/core.rs

//! Pure per-entry decision logic.
//!
//! Given the entry snapshot, the freshly fetched metadata and whether the
//! cycle is forced, decide what the IO shell should do next. Nothing here
//! touches Tokio, the network or the store, so the rules can be tested
//! exhaustively.

use crate::detect::{detect, Detection};
use crate::metadata::ProjectMetadata;
use crate::store::CasOutcome;
use crate::types::RemoteTimestamp;
use crate::watch::WatchEntry;

use super::EntryOutcome;

/// Decision for one entry after a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPlan {
    /// Call the webhook. `forced` is set when no change was detected but the
    /// cycle asked for delivery anyway.
    Dispatch { forced: bool },
    /// Cursor already covers this modification.
    SkipUnchanged,
    /// Something to report but nowhere to report it.
    SkipNoWebhook,
}

pub fn plan_entry(entry: &WatchEntry, metadata: &ProjectMetadata, force: bool) -> EntryPlan {
    let detection = detect(entry.last_observed_modified, metadata.modified);

    if detection == Detection::Unchanged && !force {
        return EntryPlan::SkipUnchanged;
    }
    if !entry.has_webhook() {
        return EntryPlan::SkipNoWebhook;
    }
    EntryPlan::Dispatch {
        forced: detection == Detection::Unchanged,
    }
}

/// Map the store's answer to a cursor commit into the entry outcome.
pub fn commit_outcome(cas: CasOutcome, cursor: RemoteTimestamp) -> EntryOutcome {
    match cas {
        CasOutcome::Applied => EntryOutcome::Notified { cursor },
        CasOutcome::Conflict { actual } => EntryOutcome::Superseded { actual },
    }
}
