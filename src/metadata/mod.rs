// src/metadata/mod.rs

//! Remote project metadata: the value fetched once per poll and the client
//! port used to fetch it.
//!
//! - [`http`] talks to the content server's `rpcGetProject` call.
//! - Tests provide scripted clients (see the `watchhook-test-utils` crate).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::RemoteTimestamp;

pub mod http;

pub use http::HttpMetadataClient;

/// Project metadata as observed by one poll. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub repo_id: String,
    pub project_id: String,
    pub created: RemoteTimestamp,
    pub created_by: String,
    pub modified: RemoteTimestamp,
    /// The server omits the updater for some system-made changes.
    pub modified_by: Option<String>,
    pub translations_up_to_date: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("project not found")]
    NotFound,

    #[error("access to project forbidden")]
    Forbidden,

    #[error("transient error: {0}")]
    Transient(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Not-found and forbidden will not heal by themselves. The entry still
    /// stays enabled; an operator has to disable it.
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::NotFound | FetchError::Forbidden)
    }
}

#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn fetch(&self, repo_id: &str, project_id: &str) -> Result<ProjectMetadata, FetchError>;
}
