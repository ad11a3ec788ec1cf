// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection};
use crate::errors::{Result, WatchhookError};
use crate::types::StoreMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchhookError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_watches(&raw)?;
        validate_watches(&raw)?;
        validate_metadata(&raw)?;
        let config = validate_global_config(&raw.config)?;
        Ok(ConfigFile::new_unchecked(config, raw.metadata, raw.watch))
    }
}

fn ensure_has_watches(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.is_empty() {
        return Err(WatchhookError::ConfigError(
            "config must contain at least one [watch.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_watches(cfg: &RawConfigFile) -> Result<()> {
    for (id, watch) in cfg.watch.iter() {
        // Ids are written as the first field of the state file.
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(WatchhookError::ConfigError(format!(
                "watch id '{id}' must be non-empty and contain no whitespace"
            )));
        }
        if watch.repo_id.trim().is_empty() {
            return Err(WatchhookError::ConfigError(format!(
                "[watch.{id}].repo_id must not be empty"
            )));
        }
        if watch.project_id.trim().is_empty() {
            return Err(WatchhookError::ConfigError(format!(
                "[watch.{id}].project_id must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_metadata(cfg: &RawConfigFile) -> Result<()> {
    if cfg.metadata.endpoint.trim().is_empty() {
        return Err(WatchhookError::ConfigError(
            "[metadata].endpoint must be set".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(raw: &RawConfigSection) -> Result<ConfigSection> {
    let poll_interval = parse_key("poll_interval", &raw.poll_interval)?;
    let fetch_timeout = parse_key("fetch_timeout", &raw.fetch_timeout)?;
    let dispatch_timeout = parse_key("dispatch_timeout", &raw.dispatch_timeout)?;

    if raw.max_concurrency == 0 {
        return Err(WatchhookError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if raw.store == StoreMode::File && raw.state_path.as_os_str().is_empty() {
        return Err(WatchhookError::ConfigError(
            "[config].state_path must be set when store = \"file\"".to_string(),
        ));
    }

    Ok(ConfigSection {
        poll_interval,
        fetch_timeout,
        dispatch_timeout,
        max_concurrency: raw.max_concurrency,
        store: raw.store,
        state_path: raw.state_path.clone(),
    })
}

fn parse_key(key: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| WatchhookError::ConfigError(format!("[config].{key}: {e}")))?;
    if duration.is_zero() {
        return Err(WatchhookError::ConfigError(format!(
            "[config].{key} must be greater than zero"
        )));
    }
    Ok(duration)
}

/// Parse a duration string like `"250ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let seconds_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
