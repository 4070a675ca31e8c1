//! Wavefront MTL parser, just enough for texture binding: `newmtl`,
//! `map_Kd`, `map_Ks`, `map_Bump`/`bump`. Everything else is ignored.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::error::{AssetLoadError, Result};
use crate::mesh::{TextureKind, TextureRef};

/// One material from an MTL file. Only the texture maps the renderer binds
/// are retained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub bump_map: Option<String>,
}

impl Material {
    /// Texture references in fixed binding order, with paths resolved
    /// against `base_dir` (the OBJ file's directory).
    ///
    /// A bump map with no specular map is bound into the specular slot;
    /// the source engine did this and shaders rely on it.
    pub fn texture_refs(&self, base_dir: &Path) -> Vec<TextureRef> {
        let mut refs = Vec::new();
        if let Some(diffuse) = &self.diffuse_map {
            refs.push(TextureRef {
                kind: TextureKind::Diffuse,
                path: resolve_map_path(base_dir, diffuse),
            });
        }
        if let Some(specular) = &self.specular_map {
            refs.push(TextureRef {
                kind: TextureKind::Specular,
                path: resolve_map_path(base_dir, specular),
            });
        } else if let Some(bump) = &self.bump_map {
            refs.push(TextureRef {
                kind: TextureKind::Specular,
                path: resolve_map_path(base_dir, bump),
            });
        }
        refs
    }
}

/// Exported MTL files often carry Windows separators.
fn resolve_map_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(name.replace('\\', "/"))
}

/// Load the ordered material table from an MTL file.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> Result<Vec<Material>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AssetLoadError::io(path, e))?;
    parse_mtl(BufReader::new(file), path)
}

fn parse_mtl<R: BufRead>(reader: R, path: &Path) -> Result<Vec<Material>> {
    let mut materials: Vec<Material> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AssetLoadError::io(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };
        // Map names may contain spaces; take the rest of the line.
        let rest = trimmed[tag.len()..].trim();

        match tag {
            "newmtl" => {
                if rest.is_empty() {
                    return Err(AssetLoadError::parse(line_no, "newmtl without a name"));
                }
                materials.push(Material {
                    name: rest.to_string(),
                    ..Material::default()
                });
            }
            "map_Kd" | "map_Ks" | "map_Bump" | "map_bump" | "bump" => {
                let material = materials.last_mut().ok_or_else(|| {
                    AssetLoadError::parse(line_no, format!("{tag} before any newmtl"))
                })?;
                if rest.is_empty() {
                    return Err(AssetLoadError::parse(line_no, format!("{tag} without a path")));
                }
                match tag {
                    "map_Kd" => material.diffuse_map = Some(rest.to_string()),
                    "map_Ks" => material.specular_map = Some(rest.to_string()),
                    _ => material.bump_map = Some(rest.to_string()),
                }
            }
            // Colors, illumination models, etc. are shader constants we
            // don't consume yet.
            _ => {}
        }
    }

    Ok(materials)
}

/// Parse an MTL string literal (tests).
pub fn load_mtl_from_str(contents: &str) -> Result<Vec<Material>> {
    parse_mtl(std::io::Cursor::new(contents), Path::new("<inline>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_table_preserves_declaration_order() {
        let src = "newmtl bricks\nmap_Kd bricks.png\nnewmtl floor\nmap_Kd floor.png\nmap_Ks floor_s.png\n";
        let table = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].name, "bricks");
        assert_eq!(table[1].name, "floor");
        assert_eq!(table[1].specular_map.as_deref(), Some("floor_s.png"));
    }

    #[test]
    fn diffuse_only_material_yields_one_diffuse_ref() {
        let table = load_mtl_from_str("newmtl m\nmap_Kd albedo.png\n").unwrap();
        let refs = table[0].texture_refs(Path::new("data/sponza"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, TextureKind::Diffuse);
        assert_eq!(refs[0].path, Path::new("data/sponza/albedo.png"));
    }

    #[test]
    fn bump_without_specular_fills_specular_slot() {
        let table = load_mtl_from_str("newmtl m\nmap_Kd a.png\nmap_Bump n.png\n").unwrap();
        let refs = table[0].texture_refs(Path::new("."));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].kind, TextureKind::Specular);
        assert!(refs[1].path.ends_with("n.png"));
    }

    #[test]
    fn backslashes_are_normalized() {
        let table = load_mtl_from_str("newmtl m\nmap_Kd textures\\sponza\\wall.tga\n").unwrap();
        let refs = table[0].texture_refs(Path::new("data"));
        assert_eq!(refs[0].path, Path::new("data/textures/sponza/wall.tga"));
    }

    #[test]
    fn map_before_newmtl_is_a_parse_error() {
        let err = load_mtl_from_str("map_Kd a.png\n").unwrap_err();
        assert!(matches!(err, AssetLoadError::Parse { line: 1, .. }));
    }
}
