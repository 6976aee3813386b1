//! Decoded texture data, RGBA8 in CPU memory.

use std::path::Path;

use anyhow::{Context, ensure};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels. The buffer length must match the dimensions.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        ensure!(
            data.len() == (width as usize) * (height as usize) * 4,
            "RGBA8 texture {}x{} needs {} bytes, got {}",
            width,
            height,
            (width as usize) * (height as usize) * 4,
            data.len()
        );
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Load texture from a PNG file.
    pub fn load_png<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::debug!("Decoding texture {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        Self::from_image(img)
    }

    /// Decode an in-memory PNG.
    pub fn from_png_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .context("Failed to decode PNG bytes")?;
        Self::from_image(img)
    }

    fn from_image(img: image::DynamicImage) -> anyhow::Result<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new_rgba8(width, height, rgba.into_raw())
    }

    /// Simple test texture (8px checkerboard, white and grey).
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size as usize) * (size as usize) * 4);

        for y in 0..size {
            for x in 0..size {
                if ((x / 8) + (y / 8)) % 2 == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
        }
    }
}
