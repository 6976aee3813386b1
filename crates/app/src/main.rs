//! Entry point for the Underworld client.

mod config;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use asset::{
    FsTextureSource, MemoryTextureSource, TextureCache, TextureData, TexturePreload,
    TextureSource,
};
use corelib::lifecycle::{Phase, PhaseHooks};
use platform::{PlatformConfig, WindowDocument};
use renderer::{GpuFactory, MAIN_MOUNT, RenderContext};

use crate::config::{AppConfig, AssetRoot};

/// Texture source picked by `--assets`.
enum ClientTextures {
    Fs(FsTextureSource),
    Builtin(MemoryTextureSource),
}

impl ClientTextures {
    fn from_config(config: &AppConfig) -> Self {
        match &config.assets {
            AssetRoot::Dir(root) => Self::Fs(FsTextureSource::new(root)),
            AssetRoot::Builtin => Self::Builtin(
                MemoryTextureSource::new()
                    .with(config.default_texture.clone(), TextureData::create_test_texture(64)),
            ),
        }
    }
}

impl TextureSource for ClientTextures {
    async fn load(&self, id: &str) -> anyhow::Result<TextureData> {
        match self {
            Self::Fs(src) => src.load(id).await,
            Self::Builtin(src) => src.load(id).await,
        }
    }
}

/// Install the texture cache and hand it back so other components can
/// `peek` what `Init` preloaded.
fn install_textures(
    config: &AppConfig,
    hooks: &mut PhaseHooks,
) -> Rc<TextureCache<ClientTextures>> {
    let cache = Rc::new(TextureCache::new(ClientTextures::from_config(config)));
    let preload = TexturePreload {
        ids: vec![config.default_texture.clone()],
        required: config.fail_on_missing_default,
    };
    TextureCache::install_hooks(cache.clone(), hooks, preload);
    cache
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = AppConfig::from_args(&args);
    log::info!(
        "Starting Underworld. Backend: {:?}, show_fps={}, window_size={}x{}, assets={:?}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.assets
    );

    let platform_config = PlatformConfig {
        width: config.width,
        height: config.height,
        show_fps: config.show_fps,
        ..Default::default()
    };

    platform::run(platform_config, move |document: &WindowDocument, hooks| {
        let textures = install_textures(&config, hooks);
        let default_texture = config.default_texture.clone();
        hooks.hook(Phase::Init, move || {
            match textures.peek(&default_texture) {
                Some(tex) => log::info!(
                    "Default texture ready: {}x{}",
                    tex.width,
                    tex.height
                ),
                None => log::warn!("Default texture '{}' is not loaded", default_texture),
            }
            Ok(())
        });

        let ctx = Rc::new(RefCell::new(RenderContext::new(GpuFactory {
            backends: config.backends,
        })));
        RenderContext::install_hooks(ctx, hooks, document.clone(), MAIN_MOUNT);
    })?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_cache_exposes_the_preloaded_texture() {
        let config = AppConfig::from_args(&["--assets=builtin".to_string()]);
        let mut hooks = PhaseHooks::new();
        let textures = install_textures(&config, &mut hooks);

        assert!(textures.peek(&config.default_texture).is_none());
        pollster::block_on(hooks.run(Phase::Init)).expect("init phase");

        let tex = textures.peek(&config.default_texture).expect("preloaded");
        assert_eq!((tex.width, tex.height), (64, 64));
    }

    #[test]
    fn missing_default_in_asset_dir_fails_init() {
        let config = AppConfig::from_args(&["--assets=/nonexistent/underworld".to_string()]);
        let mut hooks = PhaseHooks::new();
        let textures = install_textures(&config, &mut hooks);

        assert!(pollster::block_on(hooks.run(Phase::Init)).is_err());
        assert!(textures.is_empty());
    }
}
