//! Provider trait definition

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::types::{CancellationToken, ChatMessage, Fragment, ToolDescriptor};
use super::error::ProviderResult;

/// Model configuration for provider requests
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model identifier, optionally prefixed with a provider (`openrouter/...`)
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// Options for one streamed turn
#[derive(Debug, Clone, Default)]
pub struct StreamChatOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tools the model may call, with qualified names
    pub tools: Vec<ToolDescriptor>,
}

impl StreamChatOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }
}

/// Lazily produced fragments of one model response
pub type FragmentStream = Pin<Box<dyn Stream<Item = ProviderResult<Fragment>> + Send>>;

/// Model backend able to stream a response as fragments.
///
/// A tool call arrives as a `CallId` fragment, then its `Name`, then any
/// number of `ArgsDelta` fragments; `Content` may be interleaved anywhere.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "genai", "mock")
    fn name(&self) -> &str;

    /// Start streaming the model's reply to `messages`
    async fn stream_turn(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<FragmentStream>;
}
