#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use watchhook::config::model::RawConfigSection;
use watchhook::config::{ConfigFile, MetadataSection, RawConfigFile, WatchConfig};
use watchhook::metadata::ProjectMetadata;
use watchhook::types::{RemoteTimestamp, StoreMode};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults with a metadata endpoint already set.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: RawConfigSection::default(),
                metadata: MetadataSection {
                    endpoint: "http://127.0.0.1:1/api".to_string(),
                },
                watch: BTreeMap::new(),
            },
        }
    }

    pub fn with_watch(mut self, id: &str, watch: WatchConfig) -> Self {
        self.config.watch.insert(id.to_string(), watch);
        self
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.config.metadata.endpoint = endpoint.to_string();
        self
    }

    pub fn memory_store(mut self) -> Self {
        self.config.config.store = StoreMode::Memory;
        self
    }

    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config.store = StoreMode::File;
        self.config.config.state_path = path.into();
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.config.max_concurrency = n;
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.config.poll_interval = interval.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `WatchConfig`.
pub struct WatchConfigBuilder {
    watch: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn new(repo_id: &str, project_id: &str) -> Self {
        Self {
            watch: WatchConfig {
                repo_id: repo_id.to_string(),
                project_id: project_id.to_string(),
                webhook_url: String::new(),
                enabled: true,
            },
        }
    }

    pub fn webhook(mut self, template: &str) -> Self {
        self.watch.webhook_url = template.to_string();
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.watch.enabled = val;
        self
    }

    pub fn build(self) -> WatchConfig {
        self.watch
    }
}

/// Builder for `ProjectMetadata` as a fake content server would return it.
pub struct MetadataBuilder {
    metadata: ProjectMetadata,
}

impl MetadataBuilder {
    pub fn new(repo_id: &str, project_id: &str) -> Self {
        Self {
            metadata: ProjectMetadata {
                repo_id: repo_id.to_string(),
                project_id: project_id.to_string(),
                created: RemoteTimestamp::from_millis(1_600_000_000_000),
                created_by: "creator@example.com".to_string(),
                modified: RemoteTimestamp::from_millis(1_600_000_000_000),
                modified_by: None,
                translations_up_to_date: true,
            },
        }
    }

    pub fn modified(mut self, millis: i64) -> Self {
        self.metadata.modified = RemoteTimestamp::from_millis(millis);
        self
    }

    pub fn modified_by(mut self, who: &str) -> Self {
        self.metadata.modified_by = Some(who.to_string());
        self
    }

    pub fn translations_up_to_date(mut self, val: bool) -> Self {
        self.metadata.translations_up_to_date = val;
        self
    }

    pub fn build(self) -> ProjectMetadata {
        self.metadata
    }
}
