// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Per-entry failures inside a poll cycle (fetch, dispatch, CAS conflict) are
//! not errors at this level; they are logged and reported as outcomes. This
//! type covers startup and infrastructure failures.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum WatchhookError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
pub type Result<T> = std::result::Result<T, WatchhookError>;
