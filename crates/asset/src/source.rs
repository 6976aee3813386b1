//! Where texture bytes come from.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::texture::TextureData;

/// Asynchronous texture loader. The cache calls [`TextureSource::load`] at
/// most once per id for every load that succeeds.
pub trait TextureSource {
    fn load(&self, id: &str) -> impl Future<Output = anyhow::Result<TextureData>>;
}

/// Loads PNG files relative to an asset root directory.
#[derive(Clone, Debug)]
pub struct FsTextureSource {
    root: PathBuf,
}

impl FsTextureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

impl TextureSource for FsTextureSource {
    async fn load(&self, id: &str) -> anyhow::Result<TextureData> {
        TextureData::load_png(self.resolve(id))
    }
}

/// In-memory textures keyed by id; used when no asset root is configured.
#[derive(Clone, Debug, Default)]
pub struct MemoryTextureSource {
    textures: HashMap<String, TextureData>,
}

impl MemoryTextureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, texture: TextureData) -> Self {
        self.insert(id, texture);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, texture: TextureData) {
        self.textures.insert(id.into(), texture);
    }
}

impl TextureSource for MemoryTextureSource {
    async fn load(&self, id: &str) -> anyhow::Result<TextureData> {
        self.textures
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("No built-in texture named '{}'", id))
    }
}
