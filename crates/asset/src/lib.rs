//! Asset loading: CPU-side meshes and textures, plus the texture cache used
//! by the client at runtime.

pub mod cache;
pub mod mesh;
pub mod source;
pub mod texture;

pub use cache::{AssetError, TextureCache, TextureHandle, TexturePreload};
pub use source::{FsTextureSource, MemoryTextureSource, TextureSource};
pub use texture::TextureData;

/// Fallback sprite every client preloads during `Init`.
pub const DEFAULT_TEXTURE: &str = "_datapack/underworld/sprites/default.png";
