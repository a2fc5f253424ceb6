//! glTF Decoding
//!
//! Reads binary glTF (GLB) or glTF JSON with embedded buffers. Only positions
//! are read; materials and textures are the renderer's concern.

use glam::{Mat4, Vec3};
use iiif3d_core::Aabb;

use crate::asset::{AssetDecoder, DecodedAsset, MeshInstance};
use crate::{LoadError, LoadResult};

/// Decoder for self-contained glTF assets
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfDecoder;

impl GltfDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AssetDecoder for GltfDecoder {
    fn decode(&self, bytes: &[u8]) -> LoadResult<DecodedAsset> {
        let gltf::Gltf { document, blob } =
            gltf::Gltf::from_slice(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        let buffers = gltf::import_buffers(&document, None, blob)
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut meshes = Vec::new();
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    visit_node(&node, Mat4::IDENTITY, &buffers, &mut meshes);
                }
            }
            None => {
                // No scene graph: every mesh once, untransformed
                for mesh in document.meshes() {
                    collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut meshes);
                }
            }
        }

        log::debug!(
            "Decoded glTF: {} primitives, {} buffers",
            meshes.len(),
            buffers.len()
        );
        Ok(DecodedAsset::new(meshes))
    }
}

fn visit_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<MeshInstance>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, meshes);
    }
    for child in node.children() {
        visit_node(&child, world, buffers, meshes);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<MeshInstance>,
) {
    for primitive in mesh.primitives() {
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };

        let mut bounds = Aabb::EMPTY;
        let mut vertex_count = 0;
        for position in positions {
            bounds.expand_to_include(world.transform_point3(Vec3::from(position)));
            vertex_count += 1;
        }

        meshes.push(MeshInstance {
            name: mesh.name().map(str::to_owned),
            vertex_count,
            bounds,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Triangle (0,0,0) (2,0,0) (0,8,0), instanced at the root and under a
    // translated parent with a scaled child
    const TRIANGLE_SCENE: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [
            {"mesh": 0},
            {"translation": [10.0, 0.0, 0.0], "children": [2]},
            {"mesh": 0, "scale": [2.0, 2.0, 2.0]}
        ],
        "meshes": [{"name": "triangle", "primitives": [{"attributes": {"POSITION": 0}}]}],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAAEEAAAAA"
        }],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [2.0, 8.0, 0.0]
        }]
    }"#;

    #[test]
    fn test_decode_scene_graph() {
        let asset = GltfDecoder::new().decode(TRIANGLE_SCENE.as_bytes()).unwrap();

        assert_eq!(asset.meshes.len(), 2);
        assert_eq!(asset.vertex_count(), 6);
        assert_eq!(asset.meshes[0].name.as_deref(), Some("triangle"));
        assert!(!asset.procedural);

        // Child instance: translate(10) * scale(2)
        let child = asset.meshes[1].bounds;
        assert!((child.min - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!((child.max - Vec3::new(14.0, 16.0, 0.0)).length() < 1e-5);

        assert!((asset.bounds.max - Vec3::new(14.0, 16.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_decode_then_normalize() {
        let mut asset = GltfDecoder::new().decode(TRIANGLE_SCENE.as_bytes()).unwrap();
        asset.normalize(4.0);

        let bounds = asset.normalized_bounds();
        assert!(bounds.center().length() < 1e-5);
        assert!((bounds.max_dimension() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_decode_without_scene() {
        let json = TRIANGLE_SCENE
            .replace("\"scene\": 0,", "")
            .replace("\"scenes\": [{\"nodes\": [0, 1]}],", "");
        let asset = GltfDecoder::new().decode(json.as_bytes()).unwrap();
        assert_eq!(asset.meshes.len(), 1);
        assert_eq!(asset.vertex_count(), 3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let decoder = GltfDecoder::new();
        assert!(matches!(decoder.decode(b""), Err(LoadError::Decode(_))));
        assert!(matches!(decoder.decode(b"not a model"), Err(LoadError::Decode(_))));
    }
}
