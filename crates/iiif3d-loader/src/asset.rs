//! Decoded Assets
//!
//! The part of a decoded scene the loader cares about: mesh instances with
//! their vertex counts and world bounds, plus the normalization transform.

use iiif3d_core::{Aabb, FitTransform};

use crate::LoadResult;

/// One mesh primitive placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    pub name: Option<String>,
    pub vertex_count: usize,
    /// Bounds in scene space, before normalization
    pub bounds: Aabb,
}

/// A decoded asset ready to hand to a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAsset {
    pub meshes: Vec<MeshInstance>,
    /// Union of all mesh bounds, before normalization
    pub bounds: Aabb,
    /// Transform placing the asset at the origin at viewer scale
    pub transform: FitTransform,
    /// True for generated placeholders
    pub procedural: bool,
}

impl DecodedAsset {
    /// Build an asset from its mesh instances
    pub fn new(meshes: Vec<MeshInstance>) -> Self {
        let bounds = meshes
            .iter()
            .fold(Aabb::EMPTY, |bounds, mesh| bounds.merge(&mesh.bounds));
        Self {
            meshes,
            bounds,
            transform: FitTransform::IDENTITY,
            procedural: false,
        }
    }

    /// Mark the asset as generated rather than fetched
    pub fn into_procedural(mut self) -> Self {
        self.procedural = true;
        self
    }

    /// Total vertices over every mesh primitive
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertex_count).sum()
    }

    /// Center on the origin and scale the largest dimension to `target_size`
    pub fn normalize(&mut self, target_size: f32) {
        self.transform = FitTransform::fit(&self.bounds, target_size);
    }

    /// Bounds after the normalization transform
    pub fn normalized_bounds(&self) -> Aabb {
        self.bounds.transform(self.transform.matrix())
    }
}

/// Turns fetched bytes into a [`DecodedAsset`]
///
/// Decoders run on the blocking pool, so they may do CPU-heavy work.
pub trait AssetDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> LoadResult<DecodedAsset>;
}
