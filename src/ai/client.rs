use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;

use crate::{
    config::ClassifierConfig,
    domain::{Item, Verdict},
};

use super::inference::{build_request, parse_completion};

/// Black-box topic classifier: a batch in, the flagged subset out.
pub trait Classifier: Send + Sync {
    fn classify<'a>(&'a self, batch: &'a [Arc<Item>]) -> BoxFuture<'a, Result<Vec<Verdict>>>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: ClassifierConfig,
}

impl OpenAiClient {
    pub fn new(http: Client, config: ClassifierConfig) -> Self {
        Self { http, config }
    }

    async fn request_verdicts(&self, batch: &[Arc<Item>]) -> Result<Vec<Verdict>> {
        let request = build_request(
            &self.config.model,
            self.config.max_tokens,
            &self.config.topics,
            batch,
        )?;

        let mut builder = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!(
            target: "classifier",
            size = batch.len(),
            model = %self.config.model,
            "sending classification request"
        );

        let response = builder
            .send()
            .await
            .context("classification request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read classification response")?;
        tracing::debug!(
            target: "classifier",
            size = batch.len(),
            status = %status,
            bytes = body.len(),
            "classification response received"
        );
        if !status.is_success() {
            return Err(anyhow!("classifier API error ({}): {}", status, body));
        }

        parse_completion(&body)
    }
}

impl Classifier for OpenAiClient {
    fn classify<'a>(&'a self, batch: &'a [Arc<Item>]) -> BoxFuture<'a, Result<Vec<Verdict>>> {
        Box::pin(self.request_verdicts(batch))
    }
}
