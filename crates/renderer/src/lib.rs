//! Renderer: explicit render context driving a rotating cube, with a wgpu
//! backend for windows.

pub mod context;
pub mod gpu;

pub use context::{
    BackendFactory, Document, MAIN_MOUNT, Mount, RenderBackend, RenderContext, RenderError,
    RenderState,
};
pub use gpu::{GpuBackend, GpuFactory, WindowMount};
