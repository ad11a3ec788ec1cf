use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use watchhook::metadata::{FetchError, MetadataClient, ProjectMetadata};
use watchhook::notify::{render, DispatchOutcome, Dispatcher};
use watchhook::types::RemoteTimestamp;

use crate::builders::MetadataBuilder;

type ProjectKey = (String, String);

/// A fake content server.
///
/// Each project has a current metadata value (returned on every fetch) and
/// an optional queue of one-shot errors served before it. Unknown projects
/// answer `NotFound`.
#[derive(Clone, Default)]
pub struct FakeMetadataClient {
    inner: Arc<Mutex<FakeMetadataState>>,
}

#[derive(Default)]
struct FakeMetadataState {
    projects: HashMap<ProjectKey, ProjectMetadata>,
    errors: HashMap<ProjectKey, VecDeque<FetchError>>,
    calls: HashMap<ProjectKey, usize>,
    delay: Option<Duration>,
}

fn key(repo_id: &str, project_id: &str) -> ProjectKey {
    (repo_id.to_string(), project_id.to_string())
}

impl FakeMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, metadata: ProjectMetadata) {
        let mut state = self.inner.lock().unwrap();
        state
            .projects
            .insert(key(&metadata.repo_id, &metadata.project_id), metadata);
    }

    /// Register (or update) a project with the given modification time.
    pub fn set_modified(&self, repo_id: &str, project_id: &str, millis: i64) {
        let existing = self
            .inner
            .lock()
            .unwrap()
            .projects
            .get(&key(repo_id, project_id))
            .cloned();
        let metadata = match existing {
            Some(mut m) => {
                m.modified = RemoteTimestamp::from_millis(millis);
                m
            }
            None => MetadataBuilder::new(repo_id, project_id).modified(millis).build(),
        };
        self.set(metadata);
    }

    /// Serve `error` on the next fetch of this project.
    pub fn fail_next(&self, repo_id: &str, project_id: &str, error: FetchError) {
        let mut state = self.inner.lock().unwrap();
        state
            .errors
            .entry(key(repo_id, project_id))
            .or_default()
            .push_back(error);
    }

    /// Delay every fetch, e.g. to exercise timeouts.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self, repo_id: &str, project_id: &str) -> usize {
        let state = self.inner.lock().unwrap();
        state.calls.get(&key(repo_id, project_id)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MetadataClient for FakeMetadataClient {
    async fn fetch(&self, repo_id: &str, project_id: &str) -> Result<ProjectMetadata, FetchError> {
        let k = key(repo_id, project_id);
        let (delay, result) = {
            let mut state = self.inner.lock().unwrap();
            *state.calls.entry(k.clone()).or_default() += 1;

            let scripted = state.errors.get_mut(&k).and_then(|q| q.pop_front());
            let result = match scripted {
                Some(err) => Err(err),
                None => state.projects.get(&k).cloned().ok_or(FetchError::NotFound),
            };
            (state.delay, result)
        };

        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        result
    }
}

/// One recorded webhook call.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub template: String,
    /// The URL as the real dispatcher would have called it.
    pub url: String,
    pub modified: RemoteTimestamp,
}

/// A fake webhook endpoint.
///
/// - records every dispatch (with the rendered URL)
/// - answers with scripted outcomes in order, then `Delivered`.
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    inner: Arc<Mutex<FakeDispatchState>>,
}

#[derive(Default)]
struct FakeDispatchState {
    outcomes: VecDeque<DispatchOutcome>,
    calls: Vec<DispatchCall>,
    delay: Option<Duration>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, outcome: DispatchOutcome) {
        self.inner.lock().unwrap().outcomes.push_back(outcome);
    }

    /// Delay every dispatch before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn dispatch(&self, webhook_url_template: &str, metadata: &ProjectMetadata) -> DispatchOutcome {
        let (delay, outcome) = {
            let mut state = self.inner.lock().unwrap();
            state.calls.push(DispatchCall {
                template: webhook_url_template.to_string(),
                url: render(webhook_url_template, metadata),
                modified: metadata.modified,
            });
            let outcome = state
                .outcomes
                .pop_front()
                .unwrap_or(DispatchOutcome::Delivered);
            (state.delay, outcome)
        };

        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        outcome
    }
}
