use thiserror::Error;

use crate::types::Height;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{resource} not found at height {height}")]
    NotFound { resource: &'static str, height: Height },

    #[error("Chain provider rate limited the request for {resource}")]
    RateLimited { resource: &'static str },

    #[error("Transport error while fetching {resource}: {message}")]
    Transport { resource: &'static str, message: String },

    #[error("Failed to decode {resource}: {message}")]
    Decode { resource: &'static str, message: String },

    #[error("Invalid provider url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build the http client: {0}")]
    Setup(String),
}

impl ClientError {
    /// Failures a retry has a chance to fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. } | ClientError::Transport { .. })
    }
}
