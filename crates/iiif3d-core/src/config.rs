//! Model Configuration
//!
//! The ordered `level -> asset` mapping consumed by the progressive loader.
//! Insertion order is load order, and the builder rejects anything that is not
//! strictly increasing in quality.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::lod::LodLevel;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Model configuration has no LOD levels")]
    Empty,

    #[error("LOD level {next} cannot follow {previous}")]
    OutOfOrder { previous: LodLevel, next: LodLevel },
}

/// Result type for configuration building
pub type ConfigResult<T> = Result<T, ConfigError>;

/// One loadable asset for a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// Resolved asset URL (after rewriting). Blank when the source gave none.
    pub url: String,
    /// Declared file size, if the source declared one
    pub size_bytes: Option<u64>,
    /// Human readable description (the option's label)
    pub description: String,
    /// LOD hint embedded in the source metadata, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_lod: Option<String>,
    /// Quality hint embedded in the source metadata, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl AssetDescriptor {
    /// Create a descriptor with no hints
    pub fn new(
        url: impl Into<String>,
        size_bytes: Option<u64>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            size_bytes,
            description: description.into(),
            original_lod: None,
            quality: None,
        }
    }

    /// False when there is nothing to fetch
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Size formatted for listings, e.g. `12.3MB`
    pub fn formatted_size(&self) -> String {
        format_megabytes(self.size_bytes)
    }
}

/// Format a byte count as `{x.x}MB`, or `Unknown` when absent or zero
pub fn format_megabytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0 => format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0)),
        _ => String::from("Unknown"),
    }
}

/// Descriptive fields passed through to the UI, never interpreted by the loader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Free-form fields (`license`, `attribution`, ...)
    pub fields: IndexMap<String, String>,
}

/// Ordered mapping of LOD level to asset plus loading flags
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    levels: IndexMap<LodLevel, AssetDescriptor>,
    /// Whether sequential loading is enabled for this configuration
    pub progressive: bool,
    pub metadata: ModelMetadata,
}

impl ModelConfiguration {
    /// Build a configuration from `(level, asset)` pairs in load order
    pub fn new(
        levels: impl IntoIterator<Item = (LodLevel, AssetDescriptor)>,
        metadata: ModelMetadata,
    ) -> ConfigResult<Self> {
        let mut builder = Self::builder().metadata(metadata);
        for (level, asset) in levels {
            builder = builder.level(level, asset);
        }
        builder.build()
    }

    /// Start building a configuration
    pub fn builder() -> ModelConfigurationBuilder {
        ModelConfigurationBuilder::default()
    }

    /// Levels actually present, in load order
    pub fn lod_levels(&self) -> SmallVec<[LodLevel; 5]> {
        self.levels.keys().copied().collect()
    }

    /// Asset URL for a level. `None` when the level is absent or has no URL.
    pub fn url(&self, level: LodLevel) -> Option<&str> {
        self.levels
            .get(&level)
            .filter(|asset| asset.has_url())
            .map(|asset| asset.url.as_str())
    }

    /// Full descriptor for a level, if present
    pub fn descriptor(&self, level: LodLevel) -> Option<&AssetDescriptor> {
        self.levels.get(&level)
    }

    /// Position of a level in the load order
    pub fn index_of(&self, level: LodLevel) -> Option<usize> {
        self.levels.get_index_of(&level)
    }

    /// Best quality level present
    pub fn highest_level(&self) -> LodLevel {
        // Non-empty by construction
        self.levels
            .last()
            .map(|(level, _)| *level)
            .unwrap_or(LodLevel::Low)
    }

    /// Iterate `(level, asset)` pairs in load order
    pub fn iter(&self) -> impl Iterator<Item = (LodLevel, &AssetDescriptor)> {
        self.levels.iter().map(|(level, asset)| (*level, asset))
    }

    /// Number of levels present
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a built configuration
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Return the configuration with the progressive flag replaced
    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }
}

/// Builder enforcing the strictly-increasing level invariant
#[derive(Debug, Default)]
pub struct ModelConfigurationBuilder {
    levels: Vec<(LodLevel, AssetDescriptor)>,
    progressive: Option<bool>,
    metadata: ModelMetadata,
}

impl ModelConfigurationBuilder {
    /// Append a level; it must rank above every level already added
    pub fn level(mut self, level: LodLevel, asset: AssetDescriptor) -> Self {
        self.levels.push((level, asset));
        self
    }

    /// Set the progressive flag (defaults to `true`)
    pub fn progressive(mut self, progressive: bool) -> Self {
        self.progressive = Some(progressive);
        self
    }

    /// Set the pass-through metadata
    pub fn metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate and build
    pub fn build(self) -> ConfigResult<ModelConfiguration> {
        if self.levels.is_empty() {
            return Err(ConfigError::Empty);
        }

        for pair in self.levels.windows(2) {
            let (previous, next) = (pair[0].0, pair[1].0);
            if next <= previous {
                return Err(ConfigError::OutOfOrder { previous, next });
            }
        }

        Ok(ModelConfiguration {
            levels: self.levels.into_iter().collect(),
            progressive: self.progressive.unwrap_or(true),
            metadata: self.metadata,
        })
    }
}
