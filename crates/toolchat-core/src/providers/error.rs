//! Provider error types

use thiserror::Error;

/// Errors raised while streaming a turn from a model backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The backend refused the request or failed mid-stream
    #[error("{provider} backend error: {message}")]
    Backend { provider: String, message: String },

    /// The conversation could not be encoded for the backend
    #[error("could not encode history: {0}")]
    History(#[from] serde_json::Error),

    /// The turn's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Backend failure reported by `provider`
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_has_no_status() {
        let err = ProviderError::backend("openai/gpt-4o", "model overloaded");
        assert_eq!(err.to_string(), "openai/gpt-4o backend error: model overloaded");
    }
}
