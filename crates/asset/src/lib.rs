//! Asset loading/parsers (models, materials, textures).
//!
//! The OBJ loader groups faces by material and deduplicates vertices per
//! group; callers get typed errors and decide whether to abort or substitute
//! a placeholder mesh.

pub mod error;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod texture;

pub use error::AssetLoadError;
pub use mesh::{MeshGroupData, MeshVertex, ModelData, TextureKind, TextureRef};
pub use obj::load_model_from_path;
