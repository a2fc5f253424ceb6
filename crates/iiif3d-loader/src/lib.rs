//! # IIIF3D Loader
//!
//! Progressive level-of-detail loading for the IIIF 3D viewer.
//!
//! ## Features
//! - Start-once loading sessions that step through LOD levels in order
//! - Observable telemetry store for status panels
//! - glTF decoding on the blocking pool with fit-to-size normalization
//! - Procedural placeholder when an asset cannot be fetched or decoded

pub mod asset;
pub mod decode;
pub mod fallback;
pub mod session;
pub mod telemetry;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use asset::{AssetDecoder, DecodedAsset, MeshInstance};
pub use decode::GltfDecoder;
pub use fallback::{Fallback, ProceduralPlaceholder};
pub use session::{
    LevelOutcome, LoadMode, LoaderConfig, LoadingSession, SessionState, SkipReason, StartOutcome,
};
pub use telemetry::{Reading, SubscriptionId, TelemetrySnapshot, TelemetryStore, TelemetryUpdate};
pub use viewer::{LoaderContext, Viewer};

use iiif3d_core::LodLevel;
use iiif3d_platform::PlatformError;
use thiserror::Error;

/// Per-level loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch asset: {0}")]
    Fetch(#[from] PlatformError),

    #[error("Failed to decode asset: {0}")]
    Decode(String),

    #[error("No asset configured for LOD level {0}")]
    ConfigurationMissing(LodLevel),

    #[error("Loading session was cancelled")]
    Cancelled,
}

/// Result type for loading operations
pub type LoadResult<T> = Result<T, LoadError>;
