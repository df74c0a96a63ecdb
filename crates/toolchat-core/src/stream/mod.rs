//! Streaming decoder
//!
//! Backends stream a turn as loose fragments: text, a call id, a tool name,
//! and argument pieces. Nothing marks where one tool call ends except the
//! start of the next. This module rebuilds whole tool calls from that
//! sequence while passing text through untouched.
//!
//! ```rust,ignore
//! let fragments = provider.stream_turn(messages, model, options, cancel).await?;
//! let mut events = StreamDecoder::new(fragments).into_events();
//! while let Some(event) = events.next().await {
//!     match event? {
//!         DecodedEvent::Text(text) => print!("{}", text),
//!         DecodedEvent::ToolCall(call) => pending.push(call),
//!     }
//! }
//! ```

mod accumulator;
mod decoder;
mod error;

pub use accumulator::{DecodedEvent, ToolCallAccumulator};
pub use decoder::{DecodedStream, StreamDecoder};
pub use error::{StreamError, StreamResult};
