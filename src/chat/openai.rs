use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{ChatClient, ChatMessage, ChatOptions};

/// Client for OpenAI-compatible `/chat/completions` endpoints (Mistral, OpenAI).
pub struct OpenAiChat {
    api_key: String,
    endpoint: String,
    options: ChatOptions,
    client: Client,
}

impl OpenAiChat {
    /// Builds a client rooted at `base_url` (e.g. `https://api.mistral.ai/v1`).
    pub fn new(
        api_key: String,
        base_url: String,
        options: ChatOptions,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing chat API key");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            options,
            client,
        })
    }
}

impl ChatClient for OpenAiChat {
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid chat API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = ChatRequest {
            model,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            messages,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .with_context(|| format!("failed to call chat completions at {}", self.endpoint))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat completions returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse chat response")?;
        parsed.into_answer()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: usize,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn into_answer(self) -> Result<String> {
        match self.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content.unwrap_or_default()),
            None => bail!("chat response contained no choices"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
