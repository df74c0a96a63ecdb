//! Model backends
//!
//! A provider turns the conversation so far into a stream of fragments.
//!
//! ## Architecture
//!
//! Real models go through the `genai` crate, which handles:
//! - Streaming SSE parsing
//! - Provider-specific protocols (OpenAI, Anthropic, Gemini, etc.)
//! - Tool calling
//!
//! OpenAI-compatible services not native to genai (OpenRouter, Mistral, or any
//! `api_base`) are routed via genai's `ServiceTargetResolver`.
//!
//! The `MockProvider` plays scripted turns for tests.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

// Core traits and types
pub use traits::{FragmentStream, Provider, ProviderModelConfig, StreamChatOptions};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::GenaiProvider;
pub use genai_adapter::{extract_model_name, extract_provider, FragmentMapper};

// Mock provider for testing
pub use mock::{tool_call_fragments, MockProvider, MockRequest, MockStep, MockTurn};

use crate::logging::Logger;
use std::sync::Arc;

/// Create a provider by id: `mock` for the scripted provider, anything else
/// for genai.
pub fn create_provider(provider_id: &str, logger: Arc<dyn Logger>) -> Arc<dyn Provider> {
    match provider_id.to_lowercase().as_str() {
        "mock" => Arc::new(MockProvider::echo(logger)),
        _ => Arc::new(GenaiProvider::new(logger)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_create_provider() {
        assert_eq!(create_provider("mock", Arc::new(NoOpLogger)).name(), "mock");
        assert_eq!(create_provider("MOCK", Arc::new(NoOpLogger)).name(), "mock");
        assert_eq!(create_provider("anthropic", Arc::new(NoOpLogger)).name(), "genai");
    }
}
