//! Lazy decoder from a fragment stream to text and tool calls

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::providers::FragmentStream;

use super::accumulator::{DecodedEvent, ToolCallAccumulator};
use super::error::{StreamError, StreamResult};

/// Decoded events of one turn
pub type DecodedStream = Pin<Box<dyn Stream<Item = StreamResult<DecodedEvent>> + Send>>;

/// Decodes one turn's fragments.
///
/// Single use: `into_events` consumes the decoder, and a new one is created
/// for every turn. Text outside a tool call is yielded as soon as it
/// arrives; a tool call is yielded once the next call starts or the stream
/// ends, followed by any text that arrived while it was open. The first
/// error ends the stream.
pub struct StreamDecoder {
    fragments: FragmentStream,
    accumulator: ToolCallAccumulator,
}

impl StreamDecoder {
    pub fn new(fragments: FragmentStream) -> Self {
        Self {
            fragments,
            accumulator: ToolCallAccumulator::new(),
        }
    }

    pub fn into_events(self) -> DecodedStream {
        let Self {
            mut fragments,
            mut accumulator,
        } = self;

        Box::pin(async_stream::stream! {
            while let Some(item) = fragments.next().await {
                let fragment = match item {
                    Ok(fragment) => fragment,
                    Err(e) => {
                        yield Err(StreamError::from(e));
                        return;
                    }
                };

                match accumulator.push(fragment) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            match accumulator.finish() {
                Ok(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }
}
