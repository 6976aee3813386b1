//! Platform layer: window, event loop and phase dispatch.
//!
//! The window is exposed to components as a one-element document whose
//! `main` mount is the window itself. `Init` runs once after the window
//! exists; `Update` and `DrawWorld` run on every redraw.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use corelib::lifecycle::{Phase, PhaseHooks};
use renderer::{Document, MAIN_MOUNT, WindowMount};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Underworld".to_string(),
            width: 1280,
            height: 720,
            show_fps: false,
        }
    }
}

/// The window seen as a document with a single `main` mount.
#[derive(Clone)]
pub struct WindowDocument {
    main: WindowMount,
}

impl WindowDocument {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            main: WindowMount(window),
        }
    }
}

impl Document for WindowDocument {
    type Mount = WindowMount;

    fn element_by_id(&self, id: &str) -> Option<WindowMount> {
        (id == MAIN_MOUNT).then(|| self.main.clone())
    }
}

/// Open the window, let `setup` register hooks, then drive the phases until
/// the window is closed. A failed `Init` phase ends the loop and is
/// returned.
pub fn run<S>(config: PlatformConfig, setup: S) -> Result<()>
where
    S: FnOnce(&WindowDocument, &mut PhaseHooks),
{
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut host = Host::new(config, setup);

    event_loop
        .run_app(&mut host)
        .context("winit event loop terminated with error")?;

    match host.fault {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            log::info!("FPS: {:.1}", self.frames as f64 / elapsed.as_secs_f64());
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

struct Host<S> {
    config: PlatformConfig,
    setup: Option<S>,
    hooks: PhaseHooks,
    window: Option<Arc<Window>>,
    fps: Option<FpsCounter>,
    fault: Option<anyhow::Error>,
}

impl<S> Host<S>
where
    S: FnOnce(&WindowDocument, &mut PhaseHooks),
{
    fn new(config: PlatformConfig, setup: S) -> Self {
        let fps = config.show_fps.then(FpsCounter::new);
        Self {
            config,
            setup: Some(setup),
            hooks: PhaseHooks::new(),
            window: None,
            fps,
            fault: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let document = WindowDocument::new(window.clone());
        if let Some(setup) = self.setup.take() {
            setup(&document, &mut self.hooks);
        }
        self.window = Some(window);

        pollster::block_on(self.hooks.run(Phase::Init)).context("Init phase failed")?;
        Ok(())
    }

    fn frame(&mut self) {
        // Per-frame phases never fail; hook errors are logged by the dispatcher.
        for phase in [Phase::Update, Phase::DrawWorld] {
            if let Err(e) = pollster::block_on(self.hooks.run(phase)) {
                log::error!("{:?} phase failed: {:#}", phase, e);
            }
        }
        if let Some(fps) = self.fps.as_mut() {
            fps.tick();
        }
    }
}

impl<S> ApplicationHandler for Host<S>
where
    S: FnOnce(&WindowDocument, &mut PhaseHooks),
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("Startup failed: {:#}", e);
            self.fault = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                // The renderer picks the new size up from the mount on its next frame.
                log::debug!("Resized: {}x{}", size.width, size.height);
            }
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
