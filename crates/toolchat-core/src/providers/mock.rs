//! Mock provider for testing
//!
//! Plays back scripted turns as fragment streams without network access.
//! When the script runs out it echoes the last user message, so a session
//! driven by a mock always terminates.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{FragmentStream, Provider, ProviderModelConfig, StreamChatOptions};
use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage, Fragment, MessageRole};

/// One item of a scripted response
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Yield this fragment
    Fragment(Fragment),
    /// Fail the stream with this message
    Error(String),
}

/// A scripted response to one `stream_turn` call
#[derive(Debug, Clone, PartialEq)]
pub enum MockTurn {
    /// Stream these steps in order
    Stream(Vec<MockStep>),
    /// Refuse the request before any fragment is produced
    Reject(String),
}

impl MockTurn {
    /// Turn made only of fragments
    pub fn fragments(fragments: Vec<Fragment>) -> Self {
        MockTurn::Stream(fragments.into_iter().map(MockStep::Fragment).collect())
    }

    /// Plain text reply
    pub fn text(text: impl Into<String>) -> Self {
        Self::fragments(vec![Fragment::content(text)])
    }

    /// Turn requesting one tool call per `(id, name, arguments)`
    pub fn tool_calls<'a>(calls: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        Self::fragments(
            calls
                .into_iter()
                .flat_map(|(id, name, arguments)| tool_call_fragments(id, name, arguments))
                .collect(),
        )
    }
}

/// Fragments announcing one complete tool call
pub fn tool_call_fragments(id: &str, name: &str, arguments: &str) -> Vec<Fragment> {
    let mut fragments = vec![Fragment::call_id(id), Fragment::name(name)];
    if !arguments.is_empty() {
        fragments.push(Fragment::args_delta(arguments));
    }
    fragments
}

/// What the provider was asked for on one call
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub messages: Vec<ChatMessage>,
    /// Qualified names of the tools offered to the model
    pub tools: Vec<String>,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    script: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<MockRequest>>,
    chunk_delay_ms: u64,
    chunk_size: usize,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    /// Create a provider with an empty script (echo mode)
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            chunk_delay_ms: 0,
            chunk_size: 10,
            logger,
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(logger)
    }

    /// Create a provider that plays `turns` in order
    pub fn scripted(turns: Vec<MockTurn>, logger: Arc<dyn Logger>) -> Self {
        let provider = Self::new(logger);
        provider.script.lock().extend(turns);
        provider
    }

    /// Append a turn to the script
    pub fn push_turn(&self, turn: MockTurn) {
        self.script.lock().push_back(turn);
    }

    /// Set delay between fragments
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.chunk_delay_ms = delay_ms;
        self
    }

    /// Set chunk size for splitting echo responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Number of `stream_turn` calls so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Scripted turns not yet played
    pub fn remaining_turns(&self) -> usize {
        self.script.lock().len()
    }

    /// Extract last user message content
    fn get_last_user_message(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User && !m.content.is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_turn(
        &self,
        messages: Vec<ChatMessage>,
        _model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<FragmentStream> {
        self.requests.lock().push(MockRequest {
            messages: messages.clone(),
            tools: options.tools.iter().map(|t| t.qualified_name.clone()).collect(),
        });

        let next = self.script.lock().pop_front();
        let steps = match next {
            Some(MockTurn::Stream(steps)) => {
                self.logger
                    .debug(&format!("[MockProvider] Playing scripted turn, {} steps", steps.len()));
                steps
            }
            Some(MockTurn::Reject(message)) => {
                self.logger.debug("[MockProvider] Rejecting request");
                return Err(ProviderError::backend("mock", message));
            }
            None => {
                let user_msg = Self::get_last_user_message(&messages);
                self.logger
                    .debug(&format!("[MockProvider] Echo mode, echoing: {}", user_msg));
                self.split_into_chunks(&format!("Echo: {}", user_msg))
                    .into_iter()
                    .map(|chunk| MockStep::Fragment(Fragment::Content(chunk)))
                    .collect()
            }
        };

        let delay_ms = self.chunk_delay_ms;
        let stream = stream::iter(steps.into_iter().enumerate()).then(move |(i, step)| {
            let cancel = cancel_token.clone();
            async move {
                // Apply delay (except for first fragment)
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }

                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }

                match step {
                    MockStep::Fragment(fragment) => Ok(fragment),
                    MockStep::Error(message) => {
                        Err(ProviderError::backend("mock", message))
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::types::ToolDescriptor;
    use serde_json::json;

    fn test_logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    async fn collect(provider: &MockProvider, user: &str) -> Vec<ProviderResult<Fragment>> {
        provider
            .stream_turn(
                vec![ChatMessage::user(user)],
                ProviderModelConfig::new("mock"),
                StreamChatOptions::default(),
                CancellationToken::new(),
            )
            .await
            .expect("stream should start")
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let provider = MockProvider::echo(test_logger());
        let text: String = collect(&provider, "Hello, world!")
            .await
            .into_iter()
            .map(|f| match f.expect("fragment should succeed") {
                Fragment::Content(text) => text,
                other => panic!("unexpected fragment {:?}", other),
            })
            .collect();

        assert_eq!(text, "Echo: Hello, world!");
    }

    #[tokio::test]
    async fn test_scripted_turns_play_in_order() {
        let provider = MockProvider::scripted(
            vec![
                MockTurn::tool_calls([("c1", "fs_list_dir", r#"{"path":"/tmp"}"#)]),
                MockTurn::text("done"),
            ],
            test_logger(),
        );

        let first: Vec<_> = collect(&provider, "list").await.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            first,
            vec![
                Fragment::call_id("c1"),
                Fragment::name("fs_list_dir"),
                Fragment::args_delta(r#"{"path":"/tmp"}"#),
            ]
        );

        let second: Vec<_> = collect(&provider, "list").await.into_iter().map(Result::unwrap).collect();
        assert_eq!(second, vec![Fragment::content("done")]);
        assert_eq!(provider.remaining_turns(), 0);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_error_step() {
        let provider = MockProvider::scripted(
            vec![MockTurn::Stream(vec![
                MockStep::Fragment(Fragment::content("partial")),
                MockStep::Error("connection reset".to_string()),
            ])],
            test_logger(),
        );

        let items = collect(&provider, "hi").await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(&items[1], Err(ProviderError::Backend { message, .. }) if message.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_rejected_turn() {
        let provider = MockProvider::scripted(vec![MockTurn::Reject("overloaded".into())], test_logger());
        let result = provider
            .stream_turn(
                vec![ChatMessage::user("hi")],
                ProviderModelConfig::new("mock"),
                StreamChatOptions::default(),
                CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Backend { message, .. }) if message == "overloaded"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_records_offered_tools() {
        let provider = MockProvider::echo(test_logger());
        let tool = ToolDescriptor {
            qualified_name: "fs_read".to_string(),
            description: "Read".to_string(),
            input_schema: json!({"type": "object"}),
            server_id: "fs".to_string(),
            original_name: "read".to_string(),
        };
        let _ = provider
            .stream_turn(
                vec![ChatMessage::user("hi")],
                ProviderModelConfig::new("mock"),
                StreamChatOptions::new().with_tools(vec![tool]),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(provider.requests()[0].tools, vec!["fs_read".to_string()]);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let provider = MockProvider::scripted(
            vec![MockTurn::fragments(vec![
                Fragment::content("one"),
                Fragment::content("two"),
            ])],
            test_logger(),
        )
        .with_delay(20);
        let cancel = CancellationToken::new();

        let mut stream = provider
            .stream_turn(
                vec![ChatMessage::user("hi")],
                ProviderModelConfig::new("mock"),
                StreamChatOptions::default(),
                cancel.clone(),
            )
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(ProviderError::Cancelled))));
    }

    #[test]
    fn test_chunk_splitting() {
        let provider = MockProvider::new(test_logger()).with_chunk_size(5);
        let chunks = provider.split_into_chunks("Hello, world!");

        assert_eq!(chunks, vec!["Hello", ", wor", "ld!"]);
    }
}
