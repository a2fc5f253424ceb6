//! File System Access
//!
//! Local resources live under an asset root. Root-relative URLs such as
//! `/data/models/sponza/sponza_lod3.glb` resolve below it; `file://` URLs are
//! used as absolute paths.

use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncReadExt;

use crate::fetch::{FetchProgress, ProgressFn};
use crate::{PlatformError, PlatformResult};

const READ_CHUNK: usize = 64 * 1024;

/// Local asset root
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    /// Create a resolver rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the asset root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URL to a path on disk
    pub fn resolve(&self, url: &str) -> PlatformResult<PathBuf> {
        if let Some(absolute) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(absolute));
        }

        let relative = Path::new(url.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return Err(PlatformError::InvalidUrl(url.to_string()));
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(PlatformError::InvalidUrl(url.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Read a resource in chunks, reporting progress against the file length
    pub async fn read(&self, url: &str, on_progress: ProgressFn<'_>) -> PlatformResult<Vec<u8>> {
        let path = self.resolve(url)?;
        log::debug!("Reading {} from {}", url, path.display());

        let mut file = tokio::fs::File::open(&path).await?;
        let total = file.metadata().await?.len();
        let mut buffer = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            on_progress(FetchProgress {
                loaded: buffer.len() as u64,
                total: Some(total),
            });
        }

        Ok(buffer)
    }
}
