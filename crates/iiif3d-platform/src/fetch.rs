//! Fetch Abstraction
//!
//! Manifests and assets are both fetched through [`Fetch`], so the loaders can
//! be driven by the real [`Fetcher`] or by an in-memory double in tests.

use std::path::PathBuf;

use futures_util::future::BoxFuture;

use crate::filesystem::LocalFiles;
use crate::http::HttpClient;
use crate::{PlatformError, PlatformResult};

/// Bytes received so far for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Bytes received
    pub loaded: u64,
    /// Total bytes, when the source announced it
    pub total: Option<u64>,
}

impl FetchProgress {
    /// Fraction received in `0.0..=1.0`, when the total is known
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).clamp(0.0, 1.0)),
            None => None,
        }
    }
}

/// Callback receiving incremental progress while a resource downloads
pub type ProgressFn<'a> = &'a mut (dyn FnMut(FetchProgress) + Send);

/// Resource fetching
pub trait Fetch: Send + Sync {
    /// Fetch a resource, reporting progress as chunks arrive
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, PlatformResult<Vec<u8>>>;

    /// Fetch a resource as UTF-8 text
    fn fetch_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, PlatformResult<String>> {
        Box::pin(async move {
            let mut ignore = |_: FetchProgress| {};
            let bytes = self.fetch(url, &mut ignore).await?;
            Ok(String::from_utf8(bytes)?)
        })
    }
}

/// Routes `http(s)://` URLs to HTTP and everything else to the local asset root
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: HttpClient,
    files: LocalFiles,
}

impl Fetcher {
    /// Create a fetcher resolving relative URLs under `asset_root`
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            http: HttpClient::new(),
            files: LocalFiles::new(asset_root),
        }
    }

    /// Create a fetcher from explicit parts
    pub fn with_parts(http: HttpClient, files: LocalFiles) -> Self {
        Self { http, files }
    }

    /// The local asset root
    pub fn files(&self) -> &LocalFiles {
        &self.files
    }
}

impl Fetch for Fetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_progress: ProgressFn<'a>,
    ) -> BoxFuture<'a, PlatformResult<Vec<u8>>> {
        Box::pin(async move {
            if url.starts_with("http://") || url.starts_with("https://") {
                self.http.get_bytes(url, on_progress).await
            } else if url.contains("://") && !url.starts_with("file://") {
                Err(PlatformError::InvalidUrl(url.to_string()))
            } else {
                self.files.read(url, on_progress).await
            }
        })
    }
}
