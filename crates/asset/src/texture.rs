//! Texture decode: RGBA8 pixel data ready for GPU upload.

use std::path::Path;

use crate::error::{AssetLoadError, Result};

/// Decoded texture in CPU memory, always RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "data size doesn't match RGBA8 dimensions"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Decode any `image`-supported container (Sponza ships TGA and JPEG
    /// alongside PNG) and expand to RGBA8.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading texture {}", path.display());

        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => AssetLoadError::io(path, io),
            other => AssetLoadError::Decode {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::new_rgba8(width, height, rgba.into_raw()))
    }

    /// Checkerboard test texture; also the visual for missing material maps.
    pub fn checkerboard(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                if ((x / 8) + (y / 8)) % 2 == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }
        Self::new_rgba8(size, size, data)
    }

    /// Uniform 1x1 texture; used as the neutral fallback for unbound
    /// material slots.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::new_rgba8(1, 1, rgba.to_vec())
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width * self.height * 4) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_is_valid() {
        let tex = TextureData::checkerboard(32);
        assert!(tex.is_valid());
        assert_eq!(tex.data.len(), 32 * 32 * 4);
    }

    #[test]
    fn solid_is_one_pixel() {
        let tex = TextureData::solid([255, 255, 255, 255]);
        assert!(tex.is_valid());
        assert_eq!((tex.width, tex.height), (1, 1));
    }

    #[test]
    fn missing_texture_maps_to_not_found() {
        let err = TextureData::load_from_path("no/such/texture.png").unwrap_err();
        assert!(matches!(err, AssetLoadError::NotFound(_)));
    }
}
