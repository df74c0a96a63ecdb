//! Where a running session delivers its events

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::TurnEvent;

/// The consumer of a sink is gone
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Receives turn events in the order they happen
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: TurnEvent) -> Result<(), SinkClosed>;
}

/// Forwards events over a tokio channel (streaming mode)
pub struct ChannelSink {
    tx: mpsc::Sender<TurnEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that reads from it
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<TurnEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::Sender<TurnEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: TurnEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }
}

/// Buffers every event (non-streaming mode)
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Vec<TurnEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TurnEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TurnEvent> {
        self.events
    }

    /// All text fragments joined
    pub fn text(&self) -> String {
        self.events.iter().filter_map(TurnEvent::as_text).collect()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&mut self, event: TurnEvent) -> Result<(), SinkClosed> {
        self.events.push(event);
        Ok(())
    }
}
