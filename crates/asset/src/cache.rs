//! Texture cache keyed by asset id.
//!
//! Entries are created by the first successful load and then live for as
//! long as the cache does; there is no eviction. Concurrent misses for the
//! same id share one in-flight load and all see its outcome, success or
//! failure. A failed load leaves nothing behind, so the next call simply
//! tries again.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::rc::Rc;
use std::sync::Arc;

use corelib::lifecycle::{Phase, PhaseHooks};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::source::TextureSource;
use crate::texture::TextureData;

/// Shared handle to a loaded texture. Two handles for the same id are
/// `Arc::ptr_eq`.
pub type TextureHandle = Arc<TextureData>;

#[derive(Clone, Debug, Error)]
pub enum AssetError {
    #[error("failed to load texture '{id}'")]
    LoadFailure {
        id: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
}

/// One load attempt. Every caller that joined it gets the same outcome.
type Slot = Arc<OnceCell<Result<TextureHandle, AssetError>>>;

pub struct TextureCache<S> {
    source: S,
    // Never held across an await.
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: TextureSource> TextureCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cached handle for `id`, or `None` if it has not finished loading.
    pub fn peek(&self, id: &str) -> Option<TextureHandle> {
        match self.slots.lock().get(id)?.get() {
            Some(Ok(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peek(id).is_some()
    }

    /// Return the cached texture or load it through the source.
    pub async fn ensure_loaded(&self, id: &str) -> Result<TextureHandle, AssetError> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(id.to_owned()).or_default().clone()
        };

        // The first caller runs the load; the others wait on the cell and
        // receive the same result.
        let outcome = slot
            .get_or_init(|| async {
                log::info!("Loading texture '{}'", id);
                match self.source.load(id).await {
                    Ok(texture) => {
                        log::info!(
                            "Loaded texture '{}' {}x{} ({} bytes)",
                            id,
                            texture.width,
                            texture.height,
                            texture.data.len()
                        );
                        Ok(Arc::new(texture))
                    }
                    Err(e) => {
                        log::warn!("Texture '{}' failed to load: {:#}", id, e);
                        Err(AssetError::LoadFailure {
                            id: id.to_owned(),
                            source: Arc::from(Box::<dyn StdError + Send + Sync>::from(e)),
                        })
                    }
                }
            })
            .await
            .clone();

        if outcome.is_err() {
            self.forget_attempt(id, &slot);
        }
        outcome
    }

    /// Drop a failed attempt so the next miss starts a fresh load. A newer
    /// slot for the same id is left alone.
    fn forget_attempt(&self, id: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        if slots.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(id);
        }
    }

    /// Load every id in order, stopping at the first failure.
    pub async fn preload(&self, ids: &[String]) -> Result<Vec<TextureHandle>, AssetError> {
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            handles.push(self.ensure_loaded(id).await?);
        }
        Ok(handles)
    }

    /// Number of loaded textures. In-flight and failed loads don't count.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot.get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the loaded textures, sorted.
    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot.get(), Some(Ok(_))))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Textures loaded during [`Phase::Init`].
#[derive(Clone, Debug)]
pub struct TexturePreload {
    pub ids: Vec<String>,
    /// When set, a failed preload fails the `Init` phase. Otherwise it is
    /// logged and startup continues without the texture.
    pub required: bool,
}

impl<S: TextureSource + 'static> TextureCache<S> {
    /// Register the startup preload with the host's lifecycle.
    pub fn install_hooks(cache: Rc<Self>, hooks: &mut PhaseHooks, preload: TexturePreload) {
        hooks.hook_async(Phase::Init, move || {
            let cache = cache.clone();
            let preload = preload.clone();
            async move {
                log::info!("Loading default texture(s): {:?}", preload.ids);
                let result: anyhow::Result<()> = match cache.preload(&preload.ids).await {
                    Ok(_) => Ok(()),
                    Err(e) if preload.required => Err(e.into()),
                    Err(e) => {
                        let e = anyhow::Error::from(e);
                        log::warn!("Continuing without preloaded texture: {:#}", e);
                        Ok(())
                    }
                };
                result
            }
        });
    }
}
