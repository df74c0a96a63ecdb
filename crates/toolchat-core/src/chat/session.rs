//! Turn orchestration
//!
//! One `ChatSession` owns a conversation. Each turn sends the history and
//! the tool catalog to the provider, forwards text as it streams in, then
//! runs every requested tool call in order and appends the results. The
//! loop ends when a turn requests no tools.

use std::sync::Arc;

use futures::StreamExt;

use super::error::{ChatError, ChatResult};
use super::sink::EventSink;
use crate::config::SessionConfig;
use crate::logging::Logger;
use crate::providers::{Provider, ProviderError, ProviderModelConfig, StreamChatOptions};
use crate::stream::{DecodedEvent, StreamDecoder, StreamError};
use crate::tools::ToolRegistry;
use crate::types::{CancellationToken, ChatMessage, ToolCall, TurnEvent};

/// How a single turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered without tools; the conversation is complete
    Complete { text: String },
    /// The model requested tools; results were appended and another turn is due
    ToolCalls { count: usize },
}

/// A conversation driven against one provider and a shared tool registry
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    config: SessionConfig,
    history: Vec<ChatMessage>,
    cancel: CancellationToken,
    logger: Arc<dyn Logger>,
}

impl ChatSession {
    /// Start a new conversation, seeded with the configured system prompt
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: SessionConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let history = config
            .system_prompt
            .iter()
            .map(|prompt| ChatMessage::system(prompt.clone()))
            .collect();

        Self {
            provider,
            tools,
            config,
            history,
            cancel: CancellationToken::new(),
            logger,
        }
    }

    /// Continue an existing conversation instead
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Use a caller-owned cancellation token
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ChatMessage> {
        self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token that stops this session at its next suspension point
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Append a user message and run until the model stops calling tools
    pub async fn send(
        &mut self,
        user_text: impl Into<String>,
        sink: &mut dyn EventSink,
    ) -> ChatResult<String> {
        self.history.push(ChatMessage::user(user_text));
        self.run(sink).await
    }

    /// Run turns until one completes without tool calls, then emit `Done`.
    ///
    /// Any error is reported to the sink as an `Error` event before being
    /// returned. History stays usable, so a later `run` picks up from it.
    pub async fn run(&mut self, sink: &mut dyn EventSink) -> ChatResult<String> {
        match self.run_turns(sink).await {
            Ok(text) => {
                emit(sink, TurnEvent::Done).await?;
                Ok(text)
            }
            Err(ChatError::SinkClosed) => {
                self.logger.info("[ChatSession] Sink closed, stopping");
                Err(ChatError::SinkClosed)
            }
            Err(e) => {
                self.logger.error(&format!("[ChatSession] Run failed: {}", e));
                // The error is returned either way; a closed sink changes nothing.
                let _ = sink.emit(TurnEvent::error(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn run_turns(&mut self, sink: &mut dyn EventSink) -> ChatResult<String> {
        let mut turns = 0usize;
        loop {
            if let Some(limit) = self.config.turn_limit() {
                if turns >= limit {
                    self.logger.warn(&format!(
                        "[ChatSession] Stopping after {} turns with tool calls still pending",
                        limit
                    ));
                    return Err(ChatError::TurnLimitExceeded { limit });
                }
            }
            turns += 1;

            match self.run_turn(sink).await? {
                TurnOutcome::Complete { text } => return Ok(text),
                TurnOutcome::ToolCalls { count } => {
                    self.logger.debug(&format!(
                        "[ChatSession] Turn {} ran {} tool calls",
                        turns, count
                    ));
                }
            }
        }
    }

    /// Run exactly one turn.
    ///
    /// A stream failure leaves history untouched (partial text is dropped).
    /// Tool failures never fail the turn; they become error tool messages.
    pub async fn run_turn(&mut self, sink: &mut dyn EventSink) -> ChatResult<TurnOutcome> {
        self.check_cancelled()?;

        let catalog = match self.tools.list_all_tools() {
            Ok(tools) => tools.to_vec(),
            Err(e) => {
                self.logger
                    .debug(&format!("[ChatSession] Sending without tools: {}", e));
                Vec::new()
            }
        };

        let mut options = StreamChatOptions::new().with_tools(catalog);
        options.temperature = self.config.temperature;
        options.max_tokens = self.config.max_tokens;

        let model = ProviderModelConfig {
            model: self.config.model.clone(),
            api_key: self.config.api_key.clone(),
            api_base: self.config.api_base.clone(),
        };

        self.logger.info(&format!(
            "[ChatSession] Sending {} messages to {} ({})",
            self.history.len(),
            self.provider.name(),
            model.model
        ));

        let fragments = self
            .provider
            .stream_turn(self.history.clone(), model, options, self.cancel.child_token())
            .await
            .map_err(provider_failure)?;

        let mut events = StreamDecoder::new(fragments).into_events();
        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();

        while let Some(event) = events.next().await {
            match event.map_err(stream_failure)? {
                DecodedEvent::Text(chunk) => {
                    text.push_str(&chunk);
                    emit(sink, TurnEvent::TextFragment { text: chunk }).await?;
                }
                DecodedEvent::ToolCall(call) => {
                    self.logger.debug(&format!(
                        "[ChatSession] Model requested {} ({})",
                        call.name, call.id
                    ));
                    calls.push(call);
                }
            }
        }

        if calls.is_empty() {
            self.history.push(ChatMessage::assistant(text.clone()));
            return Ok(TurnOutcome::Complete { text });
        }

        let count = calls.len();
        self.history
            .push(ChatMessage::assistant_tool_calls(text, calls.clone()));

        // Every requested call gets a tool message, even when the turn stops early,
        // so the history stays acceptable to the backend.
        let mut abort: Option<ChatError> = None;
        for call in &calls {
            if let Some(reason) = &abort {
                self.history
                    .push(ChatMessage::tool(call.id.clone(), format!("Error: not run: {}", reason)));
                continue;
            }

            let answered = self.history.len() + 1;
            if let Err(e) = self.run_tool_call(call, sink).await {
                if self.history.len() < answered {
                    self.history
                        .push(ChatMessage::tool(call.id.clone(), format!("Error: not run: {}", e)));
                }
                abort = Some(e);
            }
        }

        match abort {
            Some(e) => Err(e),
            None => Ok(TurnOutcome::ToolCalls { count }),
        }
    }

    async fn run_tool_call(&mut self, call: &ToolCall, sink: &mut dyn EventSink) -> ChatResult<()> {
        self.check_cancelled()?;
        emit(
            sink,
            TurnEvent::ToolCallStarted {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        )
        .await?;

        let result = self.tools.execute(call, self.config.empty_arguments).await;
        self.history
            .push(ChatMessage::tool(result.call_id.clone(), result.content.clone()));

        emit(
            sink,
            TurnEvent::ToolResult {
                name: result.name,
                content: result.content,
                is_error: result.is_error,
            },
        )
        .await
    }

    fn check_cancelled(&self) -> ChatResult<()> {
        if self.cancel.is_cancelled() {
            Err(ChatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

async fn emit(sink: &mut dyn EventSink, event: TurnEvent) -> ChatResult<()> {
    sink.emit(event).await.map_err(|_| ChatError::SinkClosed)
}

fn provider_failure(e: ProviderError) -> ChatError {
    match e {
        ProviderError::Cancelled => ChatError::Cancelled,
        other => ChatError::Provider(other),
    }
}

fn stream_failure(e: StreamError) -> ChatError {
    match e {
        StreamError::Backend(ProviderError::Cancelled) => ChatError::Cancelled,
        other => ChatError::Stream(other),
    }
}
