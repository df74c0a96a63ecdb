//! Chat session and store errors

use thiserror::Error;

use crate::providers::ProviderError;
use crate::stream::StreamError;

/// Errors that end a `run`
#[derive(Error, Debug)]
pub enum ChatError {
    /// The backend refused or failed the request
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response stream was malformed or broke off
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// The model kept requesting tools past the configured limit
    #[error("Turn limit of {limit} exceeded")]
    TurnLimitExceeded { limit: usize },

    /// The session was cancelled
    #[error("Chat cancelled")]
    Cancelled,

    /// The receiving side of the sink went away
    #[error("Event sink closed")]
    SinkClosed,
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Errors from chat persistence
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No chat with this id exists
    #[error("Chat not found: {0}")]
    NotFound(String),

    /// The id cannot be used as a file name
    #[error("Invalid chat id: {0}")]
    InvalidId(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
