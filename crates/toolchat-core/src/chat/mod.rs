//! Chat sessions
//!
//! A `ChatSession` runs the model/tool loop for one conversation and reports
//! progress to an `EventSink`. Sessions share a `ToolRegistry` and a
//! `Provider`, both injected by the caller.
//!
//! ```rust,ignore
//! let registry = Arc::new(ToolRegistry::from_config(&servers, logger.clone()));
//! registry.connect_all().await;
//!
//! let provider = create_provider("genai", logger.clone());
//! let mut chat = ChatSession::new(provider, registry.clone(), SessionConfig::from_env()?, logger);
//!
//! let (mut sink, mut events) = ChannelSink::new(64);
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{}", serde_json::to_string(&event).unwrap());
//!     }
//! });
//! chat.send("What is in /tmp?", &mut sink).await?;
//! ```

mod error;
mod session;
mod sink;
mod store;

pub use error::{ChatError, ChatResult, StoreError, StoreResult};
pub use session::{ChatSession, TurnOutcome};
pub use sink::{ChannelSink, CollectingSink, EventSink, SinkClosed};
pub use store::{ChatRecord, ChatStore, ChatSummary, FileChatStore, MemoryChatStore, EMPTY_PREVIEW};
