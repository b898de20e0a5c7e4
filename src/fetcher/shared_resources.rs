//! Process-wide HTTP client
//!
//! Every directory and sample request goes through one reqwest client so the
//! connection pool is shared by all concurrent fetch tasks.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;

use crate::downloader::config::HTTP_CONNECT_TIMEOUT;

/// Global HTTP client shared by all fetch tasks
///
/// Only the connect timeout is set here; the request deadline differs between
/// directory and sample calls and is applied per request.
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    let client = Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("Failed to build configured HTTP client, using defaults: {}", e);
            Client::new()
        });
    Arc::new(client)
});

/// Clone of the global client handle
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}
