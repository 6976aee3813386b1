//! Phase-based lifecycle hooks.
//!
//! Components don't reach into a global registrar: the host owns a
//! [`PhaseHooks`] and hands it to each component, which registers the
//! callbacks it wants run at a given [`Phase`]. The host then drives
//! [`PhaseHooks::run`] from its own loop.
//!
//! Everything here is single-threaded; hooks are neither `Send` nor `Sync`
//! and phases never overlap.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::{CoreError, CoreResult};

/// Named points of the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs once at startup. A failing hook aborts the phase.
    Init,
    /// Per-frame simulation step.
    Update,
    /// Per-frame world drawing.
    DrawWorld,
}

impl Phase {
    /// Fatal phases stop at the first failing hook and report it to the host.
    /// Per-frame phases log failures and keep going.
    pub fn is_fatal(self) -> bool {
        matches!(self, Phase::Init)
    }
}

pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

enum Hook {
    Sync(Box<dyn FnMut() -> anyhow::Result<()>>),
    Async(Box<dyn FnMut() -> HookFuture>),
}

/// Registry of per-phase callbacks, run in registration order.
#[derive(Default)]
pub struct PhaseHooks {
    hooks: HashMap<Phase, Vec<Hook>>,
}

impl PhaseHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous hook.
    pub fn hook<F>(&mut self, phase: Phase, f: F)
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.push(phase, Hook::Sync(Box::new(f)));
    }

    /// Register an asynchronous hook; [`PhaseHooks::run`] awaits it before
    /// moving on to the next one.
    pub fn hook_async<F, Fut>(&mut self, phase: Phase, mut f: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.push(phase, Hook::Async(Box::new(move || Box::pin(f()))));
    }

    fn push(&mut self, phase: Phase, hook: Hook) {
        self.hooks.entry(phase).or_default().push(hook);
    }

    /// Number of hooks registered for `phase`.
    pub fn count(&self, phase: Phase) -> usize {
        self.hooks.get(&phase).map_or(0, Vec::len)
    }

    /// Run every hook of `phase` in registration order.
    ///
    /// Returns how many hooks succeeded. For a fatal phase the first failure
    /// is returned as [`CoreError::PhaseFailed`] and the remaining hooks are
    /// skipped.
    pub async fn run(&mut self, phase: Phase) -> CoreResult<usize> {
        let Some(hooks) = self.hooks.get_mut(&phase) else {
            return Ok(0);
        };
        log::debug!("Running {:?} ({} hooks)", phase, hooks.len());

        let mut ok = 0;
        for (index, hook) in hooks.iter_mut().enumerate() {
            let result = match hook {
                Hook::Sync(f) => f(),
                Hook::Async(f) => f().await,
            };
            match result {
                Ok(()) => ok += 1,
                Err(source) if phase.is_fatal() => {
                    log::error!("{:?} hook #{} failed: {:#}", phase, index, source);
                    return Err(CoreError::PhaseFailed {
                        phase,
                        index,
                        source,
                    });
                }
                Err(e) => log::warn!("{:?} hook #{} failed: {:#}", phase, index, e),
            }
        }
        Ok(ok)
    }
}
