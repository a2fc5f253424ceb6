//! # IIIF3D Manifest
//!
//! IIIF Presentation 3.0 manifest handling for the 3D viewer.
//!
//! ## Features
//! - Fetch, parse and validate manifests and collections
//! - Typed, lenient document model behind one validation boundary
//! - Size-ranked LOD assignment for every rendering `Choice`
//! - Fixed prefix rewrite table for asset URLs

pub mod collection;
pub mod document;
pub mod extract;
pub mod label;
pub mod loader;
pub mod rewrite;
pub mod settings;

pub use collection::{Collection, ManifestSummary, Place};
pub use document::{Manifest, validate_manifest};
pub use extract::{ModelRecord, extract_models};
pub use label::{Label, label_text};
pub use loader::{LoadedManifest, ManifestLoader};
pub use rewrite::{RewriteRule, UrlRewriteTable};
pub use settings::{
    DEFAULT_COLLECTION_URL, DEFAULT_MANIFEST_URL, DEFAULT_MODEL_ID, ViewerParams, ViewerSettings,
};

use iiif3d_core::ConfigError;
use iiif3d_platform::PlatformError;
use thiserror::Error;

/// Manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to load manifest: {0}")]
    Fetch(#[from] PlatformError),

    #[error("Malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid IIIF document: {0}")]
    Validation(String),

    #[error("No model found in IIIF manifest")]
    NotFound,

    #[error("Invalid model configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;
