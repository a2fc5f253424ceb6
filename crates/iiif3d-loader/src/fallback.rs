//! Fallback Placeholder
//!
//! Installed in place of an asset that could not be fetched or decoded so the
//! viewer always has something to show.

use glam::Vec3;
use iiif3d_core::{Aabb, LodLevel};

use crate::asset::{DecodedAsset, MeshInstance};

/// Produces a placeholder asset for a failed level
pub trait Fallback: Send + Sync {
    fn placeholder(&self, level: LodLevel) -> DecodedAsset;
}

/// Unit box, 24 vertices (4 per face)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProceduralPlaceholder {
    pub size: f32,
}

impl ProceduralPlaceholder {
    const VERTICES: usize = 24;
}

impl Default for ProceduralPlaceholder {
    fn default() -> Self {
        Self { size: 1.0 }
    }
}

impl Fallback for ProceduralPlaceholder {
    fn placeholder(&self, level: LodLevel) -> DecodedAsset {
        let half = Vec3::splat(self.size * 0.5);
        DecodedAsset::new(vec![MeshInstance {
            name: Some(format!("placeholder-{}", level)),
            vertex_count: Self::VERTICES,
            bounds: Aabb::from_center_half_extents(Vec3::ZERO, half),
        }])
        .into_procedural()
    }
}
