//! HTTP Access
//!
//! Streams response bodies so download progress can be reported per chunk.

use futures_util::StreamExt;

use crate::fetch::{FetchProgress, ProgressFn};
use crate::{PlatformError, PlatformResult};

/// Cap on the up-front buffer reservation taken from `Content-Length`
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Thin wrapper over a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET a resource, failing on any non-success status
    pub async fn get_bytes(
        &self,
        url: &str,
        on_progress: ProgressFn<'_>,
    ) -> PlatformResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("GET {} returned {}", url, status);
            return Err(PlatformError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATION) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            on_progress(FetchProgress {
                loaded: body.len() as u64,
                total,
            });
        }

        log::debug!("GET {} complete ({} bytes)", url, body.len());
        Ok(body)
    }
}
