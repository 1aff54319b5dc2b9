//! Command-line and environment configuration shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};

use crate::chat::{AnthropicChat, ChatClient, ChatOptions, OpenAiChat};
use crate::embedder::OpenAiEmbedder;

const DEFAULT_MISTRAL_BASE: &str = "https://api.mistral.ai/v1";

/// Embedding endpoint settings.
#[derive(Args, Debug, Clone)]
pub struct EmbedderArgs {
    /// API key for the embedding endpoint
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Base URL for the OpenAI-compatible embedding API
    #[arg(
        long,
        env = "MDRAG_EMBEDDING_BASE",
        default_value = DEFAULT_MISTRAL_BASE
    )]
    pub embedding_base_url: String,

    /// Embedding model identifier
    #[arg(long, env = "MDRAG_EMBEDDING_MODEL", default_value = "mistral-embed")]
    pub embedding_model: String,

    /// Optional dimension override when supported by the model
    #[arg(long, env = "MDRAG_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Max inputs per embedding request
    #[arg(long, env = "MDRAG_EMBEDDING_BATCH", default_value_t = 32)]
    pub embedding_batch_size: usize,

    /// Seconds before an embedding request times out
    #[arg(long, default_value_t = 30)]
    pub embedding_timeout_secs: u64,

    /// Attempts for rate-limited or transient embedding failures
    #[arg(long, env = "MDRAG_EMBEDDING_MAX_RETRIES", default_value_t = 5)]
    pub embedding_max_retries: usize,
}

impl EmbedderArgs {
    /// Builds the embedding client.
    pub fn build(&self) -> Result<OpenAiEmbedder> {
        let key = self
            .embedding_api_key
            .clone()
            .ok_or_else(|| anyhow!("MISTRAL_API_KEY (or --embedding-api-key) must be set"))?;
        OpenAiEmbedder::new(
            key,
            self.embedding_base_url.clone(),
            self.embedding_model.clone(),
            self.embedding_dimensions,
            Duration::from_secs(self.embedding_timeout_secs.max(1)),
            self.embedding_max_retries,
            self.embedding_batch_size,
        )
    }
}

/// Supported chat backends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChatProvider {
    /// OpenAI-compatible chat completions (Mistral, OpenAI).
    Openai,
    /// Anthropic messages API.
    Anthropic,
}

/// Chat endpoint settings.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Chat backend
    #[arg(long, env = "MDRAG_CHAT_PROVIDER", value_enum, default_value_t = ChatProvider::Openai)]
    pub chat_provider: ChatProvider,

    /// API key for the chat endpoint
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// Base URL for the chat API (provider default when unset)
    #[arg(long, env = "MDRAG_CHAT_BASE")]
    pub chat_base_url: Option<String>,

    /// Chat model identifier
    #[arg(long, env = "MISTRAL_CHAT_MODEL", default_value = "mistral-large-latest")]
    pub chat_model: String,

    /// Sampling temperature for the answer model
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to request from the completion model
    #[arg(long, default_value_t = 1024)]
    pub max_completion_tokens: usize,

    /// Seconds before a chat request times out
    #[arg(long, default_value_t = 60)]
    pub chat_timeout_secs: u64,
}

impl ChatArgs {
    /// Builds the selected chat client.
    pub fn build(&self) -> Result<Arc<dyn ChatClient>> {
        let key = self
            .chat_api_key
            .clone()
            .ok_or_else(|| anyhow!("MISTRAL_API_KEY (or --chat-api-key) must be set"))?;
        let options = ChatOptions {
            temperature: self.temperature,
            max_tokens: self.max_completion_tokens.max(1),
        };
        let timeout = Duration::from_secs(self.chat_timeout_secs.max(1));
        let client: Arc<dyn ChatClient> = match self.chat_provider {
            ChatProvider::Openai => Arc::new(OpenAiChat::new(
                key,
                self.chat_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MISTRAL_BASE.to_string()),
                options,
                timeout,
            )?),
            ChatProvider::Anthropic => Arc::new(AnthropicChat::new(
                key,
                self.chat_base_url.clone(),
                options,
                timeout,
            )?),
        };
        Ok(client)
    }
}

/// Location of the persisted index.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Directory holding vectors.bin and chunks.json
    #[arg(long, env = "RAG_INDEX_DIR", default_value = "storage")]
    pub index_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        embedder: EmbedderArgs,
        #[command(flatten)]
        chat: ChatArgs,
        #[command(flatten)]
        storage: StorageArgs,
    }

    #[test]
    fn flattened_groups_have_unique_ids() {
        use clap::CommandFactory;
        Harness::command().debug_assert();
    }

    #[test]
    fn defaults_target_mistral() {
        let parsed = Harness::try_parse_from([
            "harness",
            "--embedding-api-key",
            "k1",
            "--chat-api-key",
            "k2",
        ])
        .unwrap();
        assert_eq!(parsed.embedder.embedding_model, "mistral-embed");
        assert_eq!(parsed.embedder.embedding_base_url, DEFAULT_MISTRAL_BASE);
        assert_eq!(parsed.chat.chat_provider, ChatProvider::Openai);
        assert_eq!(parsed.chat.chat_model, "mistral-large-latest");
        assert!(parsed.embedder.build().is_ok());
        assert!(parsed.chat.build().is_ok());
    }

    #[test]
    fn embedding_and_chat_flags_are_independent() {
        let parsed = Harness::try_parse_from([
            "harness",
            "--embedding-model",
            "embed-small",
            "--chat-model",
            "chat-large",
            "--embedding-base-url",
            "http://embed.local/v1",
            "--chat-base-url",
            "http://chat.local/v1",
            "--embedding-timeout-secs",
            "7",
            "--chat-timeout-secs",
            "9",
        ])
        .unwrap();
        assert_eq!(parsed.embedder.embedding_model, "embed-small");
        assert_eq!(parsed.chat.chat_model, "chat-large");
        assert_eq!(parsed.embedder.embedding_base_url, "http://embed.local/v1");
        assert_eq!(parsed.chat.chat_base_url.as_deref(), Some("http://chat.local/v1"));
        assert_eq!(parsed.embedder.embedding_timeout_secs, 7);
        assert_eq!(parsed.chat.chat_timeout_secs, 9);
    }

    #[test]
    fn provider_is_selectable() {
        let parsed = Harness::try_parse_from([
            "harness",
            "--chat-provider",
            "anthropic",
            "--chat-api-key",
            "k",
            "--index-dir",
            "/tmp/idx",
        ])
        .unwrap();
        assert_eq!(parsed.chat.chat_provider, ChatProvider::Anthropic);
        assert_eq!(parsed.storage.index_dir, PathBuf::from("/tmp/idx"));
    }
}
