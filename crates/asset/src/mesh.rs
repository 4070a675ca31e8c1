//! CPU-side mesh and model representations produced by loaders.

use std::path::PathBuf;

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Role a texture plays in a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

/// Reference to a texture file bound by a material group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub kind: TextureKind,
    pub path: PathBuf,
}

/// One draw unit: all faces of a model that share a material.
///
/// `indices` are local to this group's `vertices`; no vertex data is shared
/// across groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGroupData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureRef>,
}

impl MeshGroupData {
    /// Empty groups are kept so group indices keep matching the material
    /// table, but they never become GPU resources.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Parsed model: group 0 holds faces without a material, group `i + 1`
/// corresponds to material `i` in the source file's material table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelData {
    pub groups: Vec<MeshGroupData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(|g| g.indices.len() / 3).sum()
    }

    /// Unit cube with per-face normals, one untextured group. Substituted
    /// by the editor when a scene's model fails to load.
    pub fn placeholder_cube() -> Self {
        // Face normal plus the two in-plane axes spanning its quad, chosen
        // so the winding is CCW seen from outside.
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // +Z
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // -Z
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]), // +X
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]), // -X
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]), // +Y
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]), // -Y
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in FACES {
            let n = normal;
            let base = vertices.len() as u32;
            for (su, sv, uv) in [
                (-0.5, -0.5, [0.0, 1.0]),
                (0.5, -0.5, [1.0, 1.0]),
                (0.5, 0.5, [1.0, 0.0]),
                (-0.5, 0.5, [0.0, 0.0]),
            ] {
                let position = [
                    n[0] * 0.5 + u[0] * su + v[0] * sv,
                    n[1] * 0.5 + u[1] * su + v[1] * sv,
                    n[2] * 0.5 + u[2] * su + v[2] * sv,
                ];
                vertices.push(MeshVertex::new(position, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            groups: vec![MeshGroupData {
                vertices,
                indices,
                textures: Vec::new(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_is_empty() {
        assert!(MeshGroupData::default().is_empty());
    }

    #[test]
    fn placeholder_cube_shape() {
        let cube = ModelData::placeholder_cube();
        assert_eq!(cube.groups.len(), 1);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.groups[0].textures.is_empty());
        // Every face normal is unit length and axis-aligned.
        for v in &cube.groups[0].vertices {
            let n = v.normal;
            let len2 = n[0] * n[0] + n[1] * n[1] + n[2] * n[2];
            assert!((len2 - 1.0).abs() < 1e-6);
        }
    }
}
