//! # IIIF3D Core
//!
//! Shared types for the IIIF 3D viewer.
//!
//! - **LOD**: ordered quality tiers and the progressive pacing table
//! - **Config**: the ordered `level -> asset` model configuration
//! - **Math**: bounds and the fit-to-size transform

pub mod config;
pub mod lod;
pub mod math;

pub use config::{
    AssetDescriptor, ConfigError, ConfigResult, ModelConfiguration, ModelConfigurationBuilder,
    ModelMetadata, format_megabytes,
};
pub use lod::{LodDelays, LodLevel, ParseLodLevelError};
pub use math::{Aabb, FitTransform};

/// Largest bounds dimension of a normalized asset, in scene units
pub const DEFAULT_TARGET_SIZE: f32 = 4.0;
