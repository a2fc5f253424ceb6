//! Viewer Settings
//!
//! Presentation settings and the viewer's entry parameters.

use iiif3d_core::LodDelays;
use serde::{Deserialize, Serialize};

use crate::ManifestResult;

/// Manifest shown when no manifest URL is supplied
pub const DEFAULT_MANIFEST_URL: &str = "/data/manifests/sponza_iiif.json";
/// Collection listing every bundled manifest
pub const DEFAULT_COLLECTION_URL: &str = "/data/manifests/collection.json";
/// Id of the first model in a manifest
pub const DEFAULT_MODEL_ID: &str = "model";

/// Viewer presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerSettings {
    /// Model shown when the entry parameters name none
    pub default_model: String,
    /// Spin the model while idle
    pub auto_rotate: bool,
    /// Radians per second when auto-rotating
    pub rotation_speed: f32,
    /// Load levels sequentially instead of jumping to the best one
    pub enable_progressive: bool,
    /// Pause after each level during progressive loading
    pub lod_delays: LodDelays,
    pub transition_duration_ms: u64,
}

impl ViewerSettings {
    /// Parse settings from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> ManifestResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL_ID.to_string(),
            auto_rotate: true,
            rotation_speed: 0.5,
            enable_progressive: true,
            lod_delays: LodDelays::default(),
            transition_duration_ms: 500,
        }
    }
}

/// Viewer entry parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerParams {
    pub manifest_url: String,
    pub model_id: Option<String>,
}

impl ViewerParams {
    /// Build from optional parameters; blank values count as absent
    pub fn new(manifest_url: Option<String>, model_id: Option<String>) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            manifest_url: present(manifest_url).unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string()),
            model_id: present(model_id),
        }
    }
}

impl Default for ViewerParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}
