//! Chat completion capability and provider implementations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

mod anthropic;
mod openai;

pub use anthropic::AnthropicChat;
pub use openai::OpenAiChat;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the conversation.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// One message of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A user-authored message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Sampling knobs shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature; provider default when unset.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: 1024,
        }
    }
}

/// Trait implemented by concrete chat providers.
pub trait ChatClient: Send + Sync {
    /// Runs one completion over `messages` and returns the generated text.
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}

impl<C: ChatClient + ?Sized> ChatClient for std::sync::Arc<C> {
    fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(model, messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
        let json = serde_json::to_value(ChatMessage::system("rules")).unwrap();
        assert_eq!(json["role"], "system");
    }
}
