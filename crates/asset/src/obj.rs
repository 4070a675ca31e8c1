//! Wavefront OBJ loader: parses positions/normals/texcoords/faces, groups
//! faces by material and deduplicates vertices per group.
//!
//! Grouping contract:
//! - group 0 holds faces with no (or unresolved) material,
//! - group `i + 1` holds faces of material `i` in the MTL table order.
//!
//! Within a group a vertex is identified by its (position, uv) value pair;
//! the normal of the first occurrence wins.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{AssetLoadError, Result};
use crate::mesh::{MeshGroupData, MeshVertex, ModelData, TextureRef};
use crate::mtl::{self, Material};

/// Load an OBJ model (and any MTL files it references) from a file path.
pub fn load_model_from_path(path: impl AsRef<Path>) -> Result<ModelData> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AssetLoadError::io(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_obj(BufReader::new(file), base_dir)
}

/// Parse an OBJ string literal; `base_dir` anchors `mtllib` and texture
/// paths.
pub fn load_model_from_str(contents: &str, base_dir: &Path) -> Result<ModelData> {
    parse_obj(io::Cursor::new(contents), base_dir)
}

/// Dedup key: exact bit patterns of (position, uv). Normals deliberately
/// excluded so faces sharing position+uv merge even when their normals
/// disagree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: [u32; 3],
    uv: [u32; 2],
}

impl VertexKey {
    fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position: position.map(f32::to_bits),
            uv: uv.map(f32::to_bits),
        }
    }
}

#[derive(Default)]
struct GroupBuilder {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    unique: HashMap<VertexKey, u32>,
    textures: Vec<TextureRef>,
}

impl GroupBuilder {
    fn with_textures(textures: Vec<TextureRef>) -> Self {
        Self {
            textures,
            ..Self::default()
        }
    }

    /// Returns the group-local index for a vertex, inserting it on first
    /// sight. Attributes of an already-seen (position, uv) pair are kept
    /// as-is: first write wins.
    fn intern(&mut self, vertex: MeshVertex, line_no: usize) -> Result<u32> {
        let key = VertexKey::new(vertex.position, vertex.uv);
        if let Some(&index) = self.unique.get(&key) {
            return Ok(index);
        }
        let index = u32::try_from(self.vertices.len()).map_err(|_| {
            AssetLoadError::parse(line_no, format!("too many vertices in group (>{})", u32::MAX))
        })?;
        self.vertices.push(vertex);
        self.unique.insert(key, index);
        Ok(index)
    }

    fn finish(self) -> MeshGroupData {
        MeshGroupData {
            vertices: self.vertices,
            indices: self.indices,
            textures: self.textures,
        }
    }
}

fn parse_obj<R: BufRead>(reader: R, base_dir: &Path) -> Result<ModelData> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    // Group 0 is always present for material-less faces.
    let mut groups: Vec<GroupBuilder> = vec![GroupBuilder::default()];
    let mut material_index: HashMap<String, usize> = HashMap::new();
    let mut current_group: usize = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AssetLoadError::io(base_dir, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([nx, ny, nz]);
            }
            "mtllib" => {
                // Library names may contain spaces; take the rest of the line.
                let name = trimmed[tag.len()..].trim();
                if name.is_empty() {
                    return Err(AssetLoadError::parse(line_no, "mtllib without a file name"));
                }
                let mtl_path = base_dir.join(name.replace('\\', "/"));
                match mtl::load_mtl_from_path(&mtl_path) {
                    Ok(table) => {
                        append_materials(table, base_dir, &mut groups, &mut material_index);
                    }
                    Err(err) => {
                        // Faces using these materials fall back to group 0.
                        log::warn!("skipping material library {}: {err}", mtl_path.display());
                    }
                }
            }
            "usemtl" => {
                let name = trimmed[tag.len()..].trim();
                current_group = match material_index.get(name) {
                    Some(&index) => index + 1,
                    None => {
                        log::warn!(
                            "unknown material '{}' on line {}; using unknown group",
                            name,
                            line_no + 1
                        );
                        0
                    }
                };
            }
            "f" => {
                let group = &mut groups[current_group];
                let mut face_indices: Vec<u32> = Vec::new();
                for token in parts {
                    let (vi, vti, vni) = parse_face_vertex(
                        token,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                        line_no,
                    )?;

                    let position = positions.get(vi).copied().ok_or_else(|| {
                        AssetLoadError::parse(line_no, "position index out of bounds")
                    })?;
                    // Flip V: OBJ uses a bottom-left image origin.
                    let uv = vti
                        .and_then(|i| texcoords.get(i).copied())
                        .map(|[u, v]| [u, 1.0 - v])
                        .unwrap_or([0.0, 0.0]);
                    let normal = vni
                        .and_then(|i| normals.get(i).copied())
                        .unwrap_or([0.0, 0.0, 0.0]);

                    let index = group.intern(MeshVertex::new(position, normal, uv), line_no)?;
                    face_indices.push(index);
                }

                if face_indices.len() < 3 {
                    continue;
                }
                // Triangulate fan
                for tri in 1..(face_indices.len() - 1) {
                    group.indices.push(face_indices[0]);
                    group.indices.push(face_indices[tri]);
                    group.indices.push(face_indices[tri + 1]);
                }
            }
            _ => {
                // Ignore other directives (o/g/s/etc.)
            }
        }
    }

    let model = ModelData {
        groups: groups.into_iter().map(GroupBuilder::finish).collect(),
    };
    if model.triangle_count() == 0 {
        return Err(AssetLoadError::Parse {
            line: 0,
            message: "OBJ contained no faces".to_string(),
        });
    }
    Ok(model)
}

/// Extend the material table; group `i + 1` mirrors material `i`. Duplicate
/// names keep their first index, like tinyobjloader.
fn append_materials(
    table: Vec<Material>,
    base_dir: &Path,
    groups: &mut Vec<GroupBuilder>,
    material_index: &mut HashMap<String, usize>,
) {
    for material in table {
        let index = groups.len() - 1;
        material_index.entry(material.name.clone()).or_insert(index);
        groups.push(GroupBuilder::with_textures(material.texture_refs(base_dir)));
    }
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token =
        value.ok_or_else(|| AssetLoadError::parse(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|_| AssetLoadError::parse(line_no, format!("failed to parse {what}: '{token}'")))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut split = token.split('/');
    let pos = split.next().ok_or_else(|| {
        AssetLoadError::parse(line_no, format!("malformed face element '{token}'"))
    })?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// OBJ indices are 1-based; negative values count back from the end of the
/// attribute array.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i32>()
        .map_err(|_| AssetLoadError::parse(line_no, format!("invalid index '{token}'")))?;
    if raw == 0 {
        return Err(AssetLoadError::parse(
            line_no,
            "OBJ indices are 1-based; found 0",
        ));
    }

    let idx = if raw > 0 {
        (raw - 1) as isize
    } else {
        (len as isize) + (raw as isize)
    };

    if idx < 0 || idx as usize >= len {
        return Err(AssetLoadError::parse(
            line_no,
            format!("index {raw} resolved out of bounds (len={len})"),
        ));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TextureKind;

    fn parse(src: &str) -> ModelData {
        load_model_from_str(src, Path::new(".")).expect("parse obj")
    }

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let model = parse(src);
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].vertices.len(), 3);
        assert_eq!(model.groups[0].indices.len(), 3);
    }

    #[test]
    fn duplicate_position_uv_merges_and_first_normal_wins() {
        // Two triangles share vertices 1 and 3 by value; normals differ per
        // face but position+uv match, so the shared corners dedupe and keep
        // the first face's normal.
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 1.0 1.0
            vt 0.0 1.0
            vn 0.0 0.0 1.0
            vn 1.0 0.0 0.0
            f 1/1/1 2/2/1 3/3/1
            f 1/1/2 3/3/2 4/4/2
        "#;
        let model = parse(src);
        let group = &model.groups[0];
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices.len(), 6);
        // Both faces reference the same deduplicated entries.
        assert_eq!(group.indices[0], group.indices[3]); // v1
        assert_eq!(group.indices[2], group.indices[4]); // v3
        // First occurrence's normal is kept for the shared corners.
        let shared = group.vertices[group.indices[3] as usize];
        assert_eq!(shared.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn unknown_material_routes_to_group_zero() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            usemtl does_not_exist
            f 1 2 3
        "#;
        let model = parse(src);
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].indices.len(), 3);
    }

    #[test]
    fn missing_uv_and_normal_default_to_zero() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3
        "#;
        let model = parse(src);
        let v = model.groups[0].vertices[0];
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn texcoord_v_axis_is_flipped() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vt 0.25 0.25
            vt 0.5 1.0
            vt 1.0 0.0
            f 1/1 2/2 3/3
        "#;
        let model = parse(src);
        let group = &model.groups[0];
        assert_eq!(group.vertices[0].uv, [0.25, 0.75]);
        assert_eq!(group.vertices[1].uv, [0.5, 0.0]);
        assert_eq!(group.vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn quads_are_fan_triangulated() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3 4
        "#;
        let model = parse(src);
        let group = &model.groups[0];
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_resolve_from_the_end() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f -3 -2 -1
        "#;
        let model = parse(src);
        assert_eq!(model.groups[0].vertices.len(), 3);
    }

    #[test]
    fn zero_index_is_a_parse_error() {
        let src = "v 0 0 0\nf 0 1 1\n";
        let err = load_model_from_str(src, Path::new(".")).unwrap_err();
        assert!(matches!(err, AssetLoadError::Parse { .. }));
    }

    #[test]
    fn out_of_bounds_index_is_a_parse_error() {
        let src = "v 0 0 0\nf 1 2 3\n";
        let err = load_model_from_str(src, Path::new(".")).unwrap_err();
        assert!(matches!(err, AssetLoadError::Parse { .. }));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = load_model_from_path("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, AssetLoadError::NotFound(_)));
    }

    #[test]
    fn loading_twice_is_idempotent() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 1.0 1.0
            f 1/1 2/2 3/3
            f 1/1 3/3 4/1
        "#;
        let a = parse(src);
        let b = parse(src);
        assert_eq!(a, b);
    }

    #[test]
    fn materials_group_faces_with_mtl_table() {
        // Write an on-disk OBJ+MTL pair so mtllib resolution is exercised.
        let dir = std::env::temp_dir().join("constantia-obj-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("scene.mtl"),
            "newmtl first\nmap_Kd first.png\nnewmtl second\nmap_Kd second.png\nmap_Ks second_s.png\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("scene.obj"),
            r#"mtllib scene.mtl
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
usemtl second
f 1 2 3
"#,
        )
        .unwrap();

        let model = load_model_from_path(dir.join("scene.obj")).expect("parse");
        // Group 0 (unknown) + one group per material.
        assert_eq!(model.groups.len(), 3);
        assert_eq!(model.groups[0].indices.len(), 3);
        assert!(model.groups[1].is_empty()); // "first" is unused
        assert_eq!(model.groups[2].indices.len(), 3);
        assert_eq!(model.groups[2].textures.len(), 2);
        assert_eq!(model.groups[2].textures[0].kind, TextureKind::Diffuse);
        assert_eq!(model.groups[2].textures[1].kind, TextureKind::Specular);
    }
}
