//! Authenticated HTTP access to the telemetry API
//!
//! One GET per call, no retries. Non-2xx statuses surface as
//! [`FetcherError::HttpStatus`] so callers can decide between dropping and
//! reporting; everything before a status arrives is a transport error.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{FetcherError, FetcherResult, StaticToken, TokenProvider};
use crate::metrics::HttpRequestMetrics;

/// Header carrying the access token
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// HTTP client bound to an access token
#[derive(Clone)]
pub struct TelemetryHttpClient {
    client: Arc<Client>,
    token: Arc<dyn TokenProvider>,
}

impl TelemetryHttpClient {
    /// Create a client from an explicit reqwest client and token provider
    pub fn new(client: Arc<Client>, token: Arc<dyn TokenProvider>) -> Self {
        Self { client, token }
    }

    /// Global shared client with a fixed token
    pub fn shared(token: impl Into<String>) -> Self {
        Self::new(global_http_client(), Arc::new(StaticToken::new(token)))
    }

    /// GET `url` and return the raw body
    ///
    /// `kind` labels the request in metrics (`directory` or `samples`).
    ///
    /// # Errors
    /// - [`FetcherError::MissingToken`] if the provider has no token
    /// - [`FetcherError::Transport`] on connect, timeout or body read failure
    /// - [`FetcherError::HttpStatus`] on a non-2xx status
    pub async fn get_bytes(
        &self,
        url: &str,
        timeout: Duration,
        kind: &'static str,
    ) -> FetcherResult<Vec<u8>> {
        let token = self.token.token().await?;
        let request_metrics = HttpRequestMetrics::start(kind);

        debug!(url, correlation_id = request_metrics.correlation_id(), "GET");

        let response = match self
            .client
            .get(url)
            .header(ACCESS_TOKEN_HEADER, token)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                request_metrics.record_network_error(&e.to_string());
                return Err(FetcherError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        request_metrics.record_complete(status.as_u16());

        if !status.is_success() {
            return Err(FetcherError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }

    /// GET `url` and decode the body as JSON
    ///
    /// # Errors
    /// Same as [`Self::get_bytes`], plus [`FetcherError::Decode`] on malformed JSON
    pub async fn get_json<T>(&self, url: &str, timeout: Duration, kind: &'static str) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self.get_bytes(url, timeout, kind).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for TelemetryHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHttpClient").finish_non_exhaustive()
    }
}
