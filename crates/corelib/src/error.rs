//! Shared errors (renderer-agnostic).

use thiserror::Error;

use crate::lifecycle::Phase;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A hook registered for a fatal phase failed; the host decides whether
    /// to abort or continue degraded.
    #[error("{phase:?} hook #{index} failed")]
    PhaseFailed {
        phase: Phase,
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
