//! Decoder errors

use thiserror::Error;

use crate::providers::ProviderError;

/// Errors that end a decoded stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// The fragments do not describe a valid sequence of tool calls
    #[error("Malformed stream: {0}")]
    Malformed(String),

    /// The backend failed while streaming
    #[error("Backend error: {0}")]
    Backend(#[from] ProviderError),
}

pub type StreamResult<T> = Result<T, StreamError>;
