// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::PollSettings;
use crate::types::StoreMode;
use crate::watch::{WatchEntry, WatchId};

/// Top-level configuration exactly as read from TOML.
///
/// ```toml
/// [config]
/// poll_interval = "60s"
/// store = "file"
///
/// [metadata]
/// endpoint = "https://content.example.com/_ah/api/content/v1"
///
/// [watch.site-build]
/// repo_id = "my-repo"
/// project_id = "my-project"
/// webhook_url = "https://ci.example.com/build?ts={project_modified}"
/// ```
///
/// Nothing here is validated; convert into [`ConfigFile`] with `TryFrom`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,

    #[serde(default)]
    pub metadata: MetadataSection,

    /// Keys are watch ids.
    #[serde(default)]
    pub watch: BTreeMap<WatchId, WatchConfig>,
}

/// `[config]` section with durations still as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout: String,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub store: StoreMode,

    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

fn default_fetch_timeout() -> String {
    "30s".to_string()
}

fn default_dispatch_timeout() -> String {
    "60s".to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".watchhook/cursors")
}

impl Default for RawConfigSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            fetch_timeout: default_fetch_timeout(),
            dispatch_timeout: default_dispatch_timeout(),
            max_concurrency: default_max_concurrency(),
            store: StoreMode::default(),
            state_path: default_state_path(),
        }
    }
}

/// `[metadata]` section: where project metadata is fetched from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataSection {
    #[serde(default)]
    pub endpoint: String,
}

/// `[watch.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    pub repo_id: String,
    pub project_id: String,

    /// May be empty: the project is then polled but nothing is notified.
    #[serde(default)]
    pub webhook_url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Validated `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSection {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub max_concurrency: usize,
    pub store: StoreMode,
    pub state_path: PathBuf,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub metadata: MetadataSection,
    pub watch: BTreeMap<WatchId, WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        metadata: MetadataSection,
        watch: BTreeMap<WatchId, WatchConfig>,
    ) -> Self {
        Self {
            config,
            metadata,
            watch,
        }
    }

    /// Watch entries as configured, with no cursor yet.
    pub fn entries(&self) -> Vec<WatchEntry> {
        self.watch
            .iter()
            .map(|(id, w)| {
                let mut entry = WatchEntry::new(id.clone(), &w.repo_id, &w.project_id, &w.webhook_url);
                entry.enabled = w.enabled;
                entry
            })
            .collect()
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            fetch_timeout: self.config.fetch_timeout,
            dispatch_timeout: self.config.dispatch_timeout,
            max_concurrency: self.config.max_concurrency,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }
}
