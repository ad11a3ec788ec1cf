// src/engine/cycle.rs

//! One poll cycle over all enabled watch entries.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::metadata::{FetchError, MetadataClient, ProjectMetadata};
use crate::notify::{DispatchOutcome, Dispatcher, FailureReason};
use crate::store::{StoreError, WatchStore};
use crate::watch::WatchEntry;

use super::core::{commit_outcome, plan_entry, EntryPlan};
use super::{CycleContext, CycleReport, EntryOutcome, PollSettings};

/// Fetch → detect → dispatch → commit, for every enabled entry.
///
/// Cheap to clone; every clone shares the same client, dispatcher and store.
/// Entries are independent: each runs in its own task, at most
/// `max_concurrency` at a time, and a failure in one never affects another.
#[derive(Clone)]
pub struct PollCycle {
    client: Arc<dyn MetadataClient>,
    dispatcher: Arc<dyn Dispatcher>,
    store: Arc<dyn WatchStore>,
    settings: PollSettings,
}

impl fmt::Debug for PollCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollCycle")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PollCycle {
    pub fn new(
        client: Arc<dyn MetadataClient>,
        dispatcher: Arc<dyn Dispatcher>,
        store: Arc<dyn WatchStore>,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            dispatcher,
            store,
            settings,
        }
    }

    /// Run a full cycle and report per-entry outcomes.
    ///
    /// Only a failure to enumerate entries is returned as an error.
    pub async fn run(&self, ctx: CycleContext) -> Result<CycleReport, StoreError> {
        let entries = self.store.list_enabled().await?;
        info!(
            cycle = ctx.cycle_id,
            entries = entries.len(),
            force = ctx.force,
            "poll cycle started"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for entry in entries {
            let cycle = self.clone();
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed, so this only waits.
                let _permit = semaphore.acquire_owned().await.ok();
                let id = entry.id.clone();
                let outcome = cycle.process_entry(&ctx, entry).await;
                (id, outcome)
            });
        }

        let mut report = CycleReport::new(ctx.cycle_id);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    error!(cycle = ctx.cycle_id, error = %e, "entry task aborted");
                    report.aborted += 1;
                }
            }
        }
        report.results.sort_by(|a, b| a.0.cmp(&b.0));

        if let Err(e) = self.store.flush().await {
            warn!(cycle = ctx.cycle_id, error = %e, "failed to write poll times");
        }

        let elapsed_ms = (Utc::now() - ctx.started_at).num_milliseconds();
        info!(
            cycle = ctx.cycle_id,
            elapsed_ms,
            processed = report.results.len(),
            notified = report.notified(),
            failed = report.failed(),
            aborted = report.aborted,
            "poll cycle finished"
        );
        Ok(report)
    }

    /// Process a single entry snapshot.
    pub async fn process_entry(&self, ctx: &CycleContext, entry: WatchEntry) -> EntryOutcome {
        let metadata = match self.fetch(ctx, &entry).await {
            Ok(metadata) => metadata,
            Err(e) => return EntryOutcome::FetchFailed(e),
        };

        let outcome = match plan_entry(&entry, &metadata, ctx.force) {
            EntryPlan::SkipUnchanged => {
                info!(cycle = ctx.cycle_id, watch = %entry.id, modified = %metadata.modified, "skipping (up-to-date)");
                EntryOutcome::Unchanged
            }
            EntryPlan::SkipNoWebhook => {
                info!(cycle = ctx.cycle_id, watch = %entry.id, "skipping (no webhook)");
                EntryOutcome::NoWebhook
            }
            EntryPlan::Dispatch { forced } => self.dispatch_and_commit(ctx, &entry, &metadata, forced).await,
        };

        self.touch(ctx, &entry).await;
        outcome
    }

    async fn fetch(&self, ctx: &CycleContext, entry: &WatchEntry) -> Result<ProjectMetadata, FetchError> {
        let call = self.client.fetch(&entry.repo_id, &entry.project_id);
        let result = match timeout(self.settings.fetch_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        if let Err(e) = &result {
            if e.is_permanent() {
                warn!(
                    cycle = ctx.cycle_id,
                    watch = %entry.id,
                    repo = %entry.repo_id,
                    project = %entry.project_id,
                    error = %e,
                    "error fetching project; entry stays enabled until disabled by an operator"
                );
            } else {
                warn!(
                    cycle = ctx.cycle_id,
                    watch = %entry.id,
                    repo = %entry.repo_id,
                    project = %entry.project_id,
                    error = %e,
                    "error fetching project; will retry next cycle"
                );
            }
        }
        result
    }

    async fn dispatch_and_commit(
        &self,
        ctx: &CycleContext,
        entry: &WatchEntry,
        metadata: &ProjectMetadata,
        forced: bool,
    ) -> EntryOutcome {
        let call = self.dispatcher.dispatch(&entry.webhook_url_template, metadata);
        let outcome = match timeout(self.settings.dispatch_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => DispatchOutcome::Failed(FailureReason::Timeout),
        };

        if let DispatchOutcome::Failed(reason) = outcome {
            warn!(
                cycle = ctx.cycle_id,
                watch = %entry.id,
                modified = %metadata.modified,
                error = %reason,
                "webhook failed; cursor kept for retry next cycle"
            );
            return EntryOutcome::DispatchFailed(reason);
        }

        let update = entry.delivered(metadata.modified, Utc::now());
        match self.store.compare_and_set(&update).await {
            Ok(cas) => {
                let outcome = commit_outcome(cas, update.next);
                match &outcome {
                    EntryOutcome::Superseded { actual } => info!(
                        cycle = ctx.cycle_id,
                        watch = %entry.id,
                        modified = %metadata.modified,
                        actual = ?actual,
                        "webhook run, but another cycle already recorded this change"
                    ),
                    _ => info!(
                        cycle = ctx.cycle_id,
                        watch = %entry.id,
                        modified = %metadata.modified,
                        forced,
                        "webhook run"
                    ),
                }
                outcome
            }
            Err(e) => {
                error!(
                    cycle = ctx.cycle_id,
                    watch = %entry.id,
                    error = %e,
                    "webhook run but cursor could not be stored; change will be notified again"
                );
                EntryOutcome::CommitFailed(e.to_string())
            }
        }
    }

    /// Best-effort observability update.
    async fn touch(&self, ctx: &CycleContext, entry: &WatchEntry) {
        if let Err(e) = self.store.touch_poll_time(&entry.id, Utc::now()).await {
            debug!(cycle = ctx.cycle_id, watch = %entry.id, error = %e, "failed to record poll time");
        }
    }
}
