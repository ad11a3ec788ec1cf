// src/notify/http.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::metadata::ProjectMetadata;
use crate::notify::template::render;
use crate::notify::{DispatchOutcome, Dispatcher, FailureReason};

/// Webhook dispatcher issuing a plain HTTP GET to the rendered URL.
///
/// Only the status code is consumed; 2xx is delivered, anything else is a
/// failure. The method is fixed.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, webhook_url_template: &str, metadata: &ProjectMetadata) -> DispatchOutcome {
        let rendered = render(webhook_url_template, metadata);
        let url = match Url::parse(&rendered) {
            Ok(url) => url,
            Err(e) => return DispatchOutcome::Failed(FailureReason::InvalidUrl(format!("{rendered}: {e}"))),
        };

        debug!(%url, "dispatching webhook");

        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => DispatchOutcome::Delivered,
            Ok(resp) => DispatchOutcome::Failed(FailureReason::Status(resp.status().as_u16())),
            Err(e) => DispatchOutcome::Failed(classify(e)),
        }
    }
}

fn classify(err: reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        FailureReason::Timeout
    } else if err.is_connect() {
        FailureReason::Connect(err.to_string())
    } else {
        FailureReason::Other(err.to_string())
    }
}
