// src/metadata/http.rs

//! [`MetadataClient`] backed by the content server's JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metadata::{FetchError, MetadataClient, ProjectMetadata};
use crate::types::RemoteTimestamp;

const GET_PROJECT_PATH: &str = "projects/rpcGetProject";

#[derive(Debug, Serialize)]
struct GetProjectRequest<'a> {
    repo_id: &'a str,
    project_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    project_id: String,
    #[serde(default)]
    repo_ids: Vec<String>,
    #[serde(default)]
    translations_up_to_date: bool,
    mod_info: ModInfo,
}

#[derive(Debug, Deserialize)]
struct ModInfo {
    created_on_millis: Millis,
    #[serde(default)]
    created_by: String,
    updated_on_millis: Millis,
    #[serde(default)]
    updated_by: Option<String>,
}

/// The API encodes int64 fields as JSON strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Millis {
    Number(i64),
    Text(String),
}

impl Millis {
    fn to_timestamp(&self, field: &str) -> Result<RemoteTimestamp, FetchError> {
        match self {
            Millis::Number(n) => Ok(RemoteTimestamp::from_millis(*n)),
            Millis::Text(s) => s
                .parse()
                .map_err(|e| FetchError::Malformed(format!("{field} = {s:?}: {e}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    client: Client,
    endpoint: String,
}

impl HttpMetadataClient {
    /// `endpoint` is the API root, e.g.
    /// `https://content.example.com/_ah/api/content/v1`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), GET_PROJECT_PATH)
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn fetch(&self, repo_id: &str, project_id: &str) -> Result<ProjectMetadata, FetchError> {
        let url = self.url();
        debug!(repo = repo_id, project = project_id, %url, "fetching project metadata");

        let resp = self
            .client
            .post(&url)
            .json(&GetProjectRequest {
                repo_id,
                project_id,
            })
            .send()
            .await
            .map_err(classify_transport_error)?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(FetchError::Forbidden),
            status if !status.is_success() => {
                return Err(FetchError::Transient(format!("status {}", status.as_u16())));
            }
            _ => {}
        }

        let body: ProjectResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Malformed(e.to_string())
            }
        })?;

        into_metadata(body, repo_id)
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transient(err.to_string())
    }
}

fn into_metadata(body: ProjectResponse, requested_repo: &str) -> Result<ProjectMetadata, FetchError> {
    let created = body.mod_info.created_on_millis.to_timestamp("created_on_millis")?;
    let modified = body.mod_info.updated_on_millis.to_timestamp("updated_on_millis")?;
    let repo_id = body
        .repo_ids
        .into_iter()
        .next()
        .unwrap_or_else(|| requested_repo.to_string());

    Ok(ProjectMetadata {
        repo_id,
        project_id: body.project_id,
        created,
        created_by: body.mod_info.created_by,
        modified,
        modified_by: body.mod_info.updated_by,
        translations_up_to_date: body.translations_up_to_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(created: Millis, updated: Millis, repo_ids: Vec<&str>) -> ProjectResponse {
        ProjectResponse {
            project_id: "proj".to_string(),
            repo_ids: repo_ids.into_iter().map(String::from).collect(),
            translations_up_to_date: true,
            mod_info: ModInfo {
                created_on_millis: created,
                created_by: "creator@example.com".to_string(),
                updated_on_millis: updated,
                updated_by: None,
            },
        }
    }

    #[test]
    fn string_millis_are_parsed() {
        let body = response(
            Millis::Text("1600000000000".into()),
            Millis::Text("1620000000000".into()),
            vec!["repo-a", "repo-b"],
        );
        let meta = into_metadata(body, "requested").unwrap();
        assert_eq!(meta.created, RemoteTimestamp::from_millis(1_600_000_000_000));
        assert_eq!(meta.modified, RemoteTimestamp::from_millis(1_620_000_000_000));
        assert_eq!(meta.repo_id, "repo-a");
        assert_eq!(meta.modified_by, None);
    }

    #[test]
    fn numeric_millis_and_missing_repo_ids() {
        let body = response(Millis::Number(1), Millis::Number(2), vec![]);
        let meta = into_metadata(body, "requested").unwrap();
        assert_eq!(meta.modified, RemoteTimestamp::from_millis(2));
        assert_eq!(meta.repo_id, "requested");
    }

    #[test]
    fn bad_millis_is_malformed() {
        let body = response(Millis::Number(1), Millis::Text("soon".into()), vec![]);
        let err = into_metadata(body, "r").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(msg) if msg.contains("updated_on_millis")));
    }

    #[test]
    fn url_joins_endpoint_and_path() {
        let client = HttpMetadataClient::new("http://host/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url(), "http://host/api/projects/rpcGetProject");
    }
}
