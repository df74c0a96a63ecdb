//! GenaiProvider - model backend using the genai crate
//!
//! Handles every genai-supported API (OpenAI, Anthropic, Gemini, Ollama, ...)
//! plus OpenAI-compatible services selected by model prefix or `api_base`.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use genai::chat::ChatRequest;

use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, extract_model_name, to_genai_messages, to_genai_options, to_genai_tools,
    FragmentMapper,
};
use super::traits::{FragmentStream, Provider, ProviderModelConfig, StreamChatOptions};

/// Provider streaming real model responses through genai
pub struct GenaiProvider {
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        "genai"
    }

    async fn stream_turn(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<FragmentStream> {
        let model_name = extract_model_name(&model_config.model).to_string();
        self.logger.info(&format!(
            "[GenaiProvider] stream_turn: model={}, messages={}, tools={}",
            model_name,
            messages.len(),
            options.tools.len()
        ));

        let client = create_client(&model_config);

        let mut chat_req = ChatRequest::new(to_genai_messages(messages)?);
        if !options.tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(&options.tools));
        }
        let genai_options = to_genai_options(&options);

        let chat_stream = client
            .exec_chat_stream(&model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ProviderError::backend(model_name.clone(), e.to_string()))?;

        self.logger.debug("[GenaiProvider] Stream started");

        let logger = Arc::clone(&self.logger);
        let stream = async_stream::stream! {
            let mut events = chat_stream.stream;
            let mut mapper = FragmentMapper::new();

            while let Some(result) = events.next().await {
                if cancel_token.is_cancelled() {
                    logger.info("[GenaiProvider] Stream cancelled");
                    yield Err(ProviderError::Cancelled);
                    return;
                }

                match result {
                    Ok(event) => {
                        for fragment in mapper.map_event(event) {
                            yield Ok(fragment);
                        }
                    }
                    Err(e) => {
                        logger.error(&format!("[GenaiProvider] Stream error: {}", e));
                        yield Err(ProviderError::backend(model_name.clone(), e.to_string()));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
