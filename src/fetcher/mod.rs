//! Telemetry API access
//!
//! [`http`] wraps the shared reqwest client and the access token,
//! [`directory`] turns the device listing into query endpoints and
//! [`envelope`] decodes the two-level sample response.

use async_trait::async_trait;

use crate::registry::RegistryError;

pub mod directory;
pub mod envelope;
pub mod http;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Request could not be built, sent or completed
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body was not the expected JSON
    #[error("decode error: {0}")]
    Decode(String),

    /// Caller-supplied argument out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query URL could not be built
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No access token available
    #[error("missing access token: {0}")]
    MissingToken(String),
}

impl From<reqwest::Error> for FetcherError {
    fn from(e: reqwest::Error) -> Self {
        FetcherError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for FetcherError {
    fn from(e: serde_json::Error) -> Self {
        FetcherError::Decode(e.to_string())
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Source of the `x-access-token` sent with every request
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token
    async fn token(&self) -> FetcherResult<String>;
}

/// Token fixed for the whole run
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> FetcherResult<String> {
        if self.0.trim().is_empty() {
            return Err(FetcherError::MissingToken(
                "set --token or SMARTPOP_TOKEN".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}
