//! Texture decoding with placeholder fallback.

use crate::AssetError;
use meshview_common::TextureSlot;
use std::path::Path;

const PLACEHOLDER_SIZE: u32 = 8;
const PLACEHOLDER_CELL: u32 = 4;
const PLACEHOLDER_A: [u8; 4] = [255, 0, 255, 255];
const PLACEHOLDER_B: [u8; 4] = [0, 0, 0, 255];

/// Decoded RGBA8 image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Wrap raw RGBA8 pixels, or `None` if the buffer size does not match.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if expected == 0 || rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    /// A 1x1 texture of a single color.
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: color.to_vec(),
        }
    }

    /// Magenta/black checkerboard substituted for missing or broken maps.
    pub fn placeholder() -> Self {
        let mut rgba = Vec::with_capacity((PLACEHOLDER_SIZE * PLACEHOLDER_SIZE * 4) as usize);
        for y in 0..PLACEHOLDER_SIZE {
            for x in 0..PLACEHOLDER_SIZE {
                let even = (x / PLACEHOLDER_CELL + y / PLACEHOLDER_CELL) % 2 == 0;
                rgba.extend_from_slice(if even { &PLACEHOLDER_A } else { &PLACEHOLDER_B });
            }
        }
        Self {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            rgba,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ])
    }
}

/// A texture ready for upload, remembering whether it is the placeholder.
#[derive(Debug, Clone)]
pub struct LoadedTexture {
    pub image: TextureImage,
    pub is_fallback: bool,
}

/// Decode an image file into RGBA8.
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureImage, AssetError> {
    let path = path.as_ref();
    let decoded = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(e) => AssetError::io(path, e),
        source => AssetError::Image {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!(path = %path.display(), width, height, "decoded texture");
    Ok(TextureImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Load a material's map, substituting the placeholder when the path is unset or unusable.
pub fn load_texture_or_placeholder(
    path: Option<&Path>,
    slot: TextureSlot,
    material: &str,
) -> LoadedTexture {
    let Some(path) = path else {
        tracing::debug!(material, slot = slot.label(), "no texture path, using placeholder");
        return LoadedTexture {
            image: TextureImage::placeholder(),
            is_fallback: true,
        };
    };

    match load_texture(path) {
        Ok(image) => LoadedTexture {
            image,
            is_fallback: false,
        },
        Err(e) => {
            tracing::warn!(material, slot = slot.label(), "texture unavailable, using placeholder: {e}");
            LoadedTexture {
                image: TextureImage::placeholder(),
                is_fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_checkerboard() {
        let tex = TextureImage::placeholder();
        assert_eq!(tex.rgba.len(), (tex.width * tex.height * 4) as usize);
        assert_eq!(tex.pixel(0, 0), Some(PLACEHOLDER_A));
        assert_eq!(tex.pixel(PLACEHOLDER_CELL, 0), Some(PLACEHOLDER_B));
        assert_eq!(tex.pixel(PLACEHOLDER_CELL, PLACEHOLDER_CELL), Some(PLACEHOLDER_A));
        assert_eq!(tex.pixel(PLACEHOLDER_SIZE, 0), None);
    }

    #[test]
    fn from_rgba_checks_size() {
        assert!(TextureImage::from_rgba(2, 1, vec![0; 8]).is_some());
        assert!(TextureImage::from_rgba(2, 2, vec![0; 8]).is_none());
        assert!(TextureImage::from_rgba(0, 0, vec![]).is_none());
    }

    #[test]
    fn from_rgba_rejects_huge_dimensions_without_overflow() {
        assert!(TextureImage::from_rgba(65536, 65536, vec![0; 16]).is_none());
        assert!(TextureImage::from_rgba(u32::MAX, u32::MAX, vec![0; 4]).is_none());
    }

    #[test]
    fn solid_color() {
        let tex = TextureImage::solid([10, 20, 30, 255]);
        assert_eq!(tex.pixel(0, 0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn missing_path_falls_back() {
        let loaded = load_texture_or_placeholder(None, TextureSlot::Normal, "Body");
        assert!(loaded.is_fallback);
        assert_eq!(loaded.image, TextureImage::placeholder());
    }

    #[test]
    fn unreadable_file_falls_back() {
        let loaded = load_texture_or_placeholder(
            Some(Path::new("/no/such/texture.png")),
            TextureSlot::Diffuse,
            "Body",
        );
        assert!(loaded.is_fallback);
    }

    #[test]
    fn corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(load_texture(&path).is_err());
        let loaded = load_texture_or_placeholder(Some(&path), TextureSlot::Diffuse, "Body");
        assert!(loaded.is_fallback);
    }

    #[test]
    fn decodes_real_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 0, 255]));
        img.save(&path).unwrap();

        let loaded = load_texture_or_placeholder(Some(&path), TextureSlot::Diffuse, "Body");
        assert!(!loaded.is_fallback);
        assert_eq!((loaded.image.width, loaded.image.height), (2, 3));
        assert_eq!(loaded.image.pixel(1, 2), Some([255, 0, 0, 255]));
    }
}
