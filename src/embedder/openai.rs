//! Embedding client for OpenAI-compatible `/embeddings` endpoints (Mistral, OpenAI).

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::Embedder;

/// Blocking embeddings client with retry on rate limits and transient failures.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a new embeddings client rooted at `base_url` (e.g. `https://api.mistral.ai/v1`).
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
        max_retries: usize,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing embedding API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid embedding API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
            max_retries: max_retries.max(1),
            batch_size: batch_size.max(1),
        })
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let mut attempt = 1usize;
        loop {
            match self.send_once(&request, inputs.len()) {
                Attempt::Done(vectors) => return Ok(vectors),
                Attempt::Fail(err) => return Err(err),
                Attempt::Retry(reason) if attempt < self.max_retries => {
                    let delay = retry_backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_retries,
                        chunks = inputs.len(),
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "chunk embedding attempt failed; backing off"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Attempt::Retry(reason) => {
                    anyhow::bail!("chunk embedding gave up after {attempt} attempts: {reason}")
                }
            }
        }
    }

    fn send_once(&self, request: &EmbeddingRequest<'_>, expected: usize) -> Attempt {
        let resp = match self.client.post(&self.endpoint).json(request).send() {
            Ok(resp) => resp,
            Err(err) if is_retryable_error(&err) => return Attempt::Retry(err.to_string()),
            Err(err) => {
                return Attempt::Fail(
                    anyhow::Error::new(err)
                        .context(format!("could not reach embedding endpoint {}", self.endpoint)),
                )
            }
        };
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let reason = format!("embedding endpoint answered {status}: {body}");
            return if should_retry(status) {
                Attempt::Retry(reason)
            } else {
                Attempt::Fail(anyhow!(reason))
            };
        }
        let parsed = resp
            .json::<EmbeddingResponse>()
            .context("malformed embedding response")
            .and_then(|parsed| parsed.into_vectors(expected));
        match parsed {
            Ok(vectors) => Attempt::Done(vectors),
            Err(err) => Attempt::Fail(err),
        }
    }
}

/// Outcome of a single embedding HTTP call.
enum Attempt {
    Done(Vec<Vec<f32>>),
    Retry(String),
    Fail(anyhow::Error),
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_batch(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("embedding endpoint returned no embedding"))
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        anyhow::ensure!(
            inputs.len() <= self.batch_size,
            "batch of {} exceeds configured max {}",
            inputs.len(),
            self.batch_size
        );
        self.request_batch(inputs)
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    /// Vectors in input order; the endpoint may return entries out of order.
    fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        self.data.sort_by_key(|entry| entry.index);
        anyhow::ensure!(
            self.data.len() == expected,
            "embedding endpoint returned {} vectors for {} chunks",
            self.data.len(),
            expected
        );
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
