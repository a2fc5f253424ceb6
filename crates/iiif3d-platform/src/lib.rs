//! # IIIF3D Platform
//!
//! I/O layer for the IIIF 3D viewer.
//!
//! - **Fetch**: one interface for manifests and assets, with byte-progress callbacks
//! - **Http**: `http(s)://` resources through reqwest, streamed
//! - **FileSystem**: `file://` and root-relative resources under a local asset root
//! - **Timer**: stopwatch for load-time telemetry

pub mod fetch;
pub mod filesystem;
pub mod http;
pub mod timer;

pub use fetch::{Fetch, FetchProgress, Fetcher, ProgressFn};
pub use filesystem::LocalFiles;
pub use http::HttpClient;
pub use timer::Stopwatch;

use thiserror::Error;

/// Platform errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Request to {url} failed with status {status}")]
    Http { url: String, status: u16 },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("File I/O error: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Response is not valid UTF-8: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),
}

impl PlatformError {
    /// HTTP status code, if the failure was a non-success response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
