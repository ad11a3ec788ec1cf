// src/notify/mod.rs

//! Outbound notifications.
//!
//! - [`template`] renders a webhook URL from a template and metadata.
//! - [`http`] performs the single GET per dispatch and classifies the result.
//!
//! The poll cycle only sees the [`Dispatcher`] trait, so tests can script
//! outcomes without a network.

use std::fmt;

use async_trait::async_trait;

use crate::metadata::ProjectMetadata;

pub mod http;
pub mod template;

pub use http::HttpDispatcher;
pub use template::{render, Placeholder};

/// Why a dispatch did not count as delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    Timeout,
    Connect(String),
    /// The rendered template is not a usable URL.
    InvalidUrl(String),
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "webhook responded with status {code}"),
            FailureReason::Timeout => write!(f, "webhook request timed out"),
            FailureReason::Connect(msg) => write!(f, "could not connect to webhook: {msg}"),
            FailureReason::InvalidUrl(msg) => write!(f, "invalid webhook url: {msg}"),
            FailureReason::Other(msg) => write!(f, "webhook request failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Failed(FailureReason),
}

/// Performs exactly one outbound call per invocation. No internal retries:
/// a failed change is retried by the next poll cycle detecting it again.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, webhook_url_template: &str, metadata: &ProjectMetadata) -> DispatchOutcome;
}
