use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::extraction::{ExtractionRequest, ExtractionResponse, RecipeExtractor};
use super::retrieval::{ContentRetriever, RetrievalRequest, RetrievalResponse};
use super::CollaboratorError;
use crate::config::{API_TOKEN_ENV, CollaboratorConfig};
use crate::model::SourceDocument;

pub struct HttpCollaborator {
    client: Client,
    retrieval_url: Option<String>,
    extraction_url: Option<String>,
    token: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpCollaborator {
    pub fn from_config(config: &CollaboratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("recipe-qa/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build collaborator http client")?;

        Ok(Self {
            client,
            retrieval_url: config.retrieval_url.clone(),
            extraction_url: config.extraction_url.clone(),
            token: std::env::var(API_TOKEN_ENV).ok().filter(|value| !value.is_empty()),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        })
    }

    pub fn has_extraction(&self) -> bool {
        self.extraction_url.is_some()
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn post_json<B, R>(&self, service: &'static str, url: &str, body: &B) -> Result<R, CollaboratorError>
    where
        B: serde::Serialize,
        R: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.post_json_once(service, url, body) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(service, attempt, error = %err, "retrying collaborator call");
                    thread::sleep(self.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn post_json_once<B, R>(
        &self,
        service: &'static str,
        url: &str,
        body: &B,
    ) -> Result<R, CollaboratorError>
    where
        B: serde::Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .authorize(self.client.post(url).json(body))
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    CollaboratorError::Timeout {
                        service,
                        secs: self.timeout_secs,
                    }
                } else {
                    CollaboratorError::Transport {
                        service,
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                service,
                status: status.as_u16(),
            });
        }

        response.json::<R>().map_err(|err| CollaboratorError::Decode {
            service,
            message: err.to_string(),
        })
    }
}

impl ContentRetriever for HttpCollaborator {
    fn retrieve(&self, url: &str) -> Result<SourceDocument, CollaboratorError> {
        let endpoint = self
            .retrieval_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured {
                service: "retrieval",
            })?;
        let response: RetrievalResponse =
            self.post_json("retrieval", endpoint, &RetrievalRequest { url })?;
        response.into_document(url)
    }
}

impl RecipeExtractor for HttpCollaborator {
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<ExtractionResponse>, CollaboratorError> {
        let endpoint = self
            .extraction_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured {
                service: "extraction",
            })?;
        self.post_json("extraction", endpoint, request)
    }
}
