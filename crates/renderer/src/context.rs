//! Render state owned by one explicit context.
//!
//! `Uninitialized -> init -> ContextReady -> setup_scene -> SceneReady`,
//! then `render` any number of times. Calls out of that order return
//! [`RenderError::Precondition`] and leave the state untouched.

use std::cell::RefCell;
use std::rc::Rc;

use corelib::camera::Camera;
use corelib::lifecycle::{Phase, PhaseHooks};
use corelib::scene::{Drawable, DrawableId, FlatMaterial, MeshKind, Scene};
use corelib::{Vec3, vec3};
use thiserror::Error;

/// Vertical field of view of the scene camera, degrees.
pub const FOV_Y_DEG: f32 = 75.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;
/// Distance the camera is pulled back along +Z.
pub const CAMERA_DISTANCE: f32 = 5.0;
/// Cube rotation added on X and Y by every `render`, radians.
pub const ROTATION_STEP: f32 = 0.01;
pub const CUBE_COLOR: u32 = 0x00ff00;

/// Mount point id the client renders into.
pub const MAIN_MOUNT: &str = "main";

/// Element of the host document the output surface is attached to.
pub trait Mount {
    /// Current content-box size in physical pixels.
    fn client_size(&self) -> (u32, u32);
}

/// Host document: looks up mount points by id.
pub trait Document {
    type Mount: Mount;

    fn element_by_id(&self, id: &str) -> Option<Self::Mount>;
}

/// Presents a scene on an attached surface.
pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32);

    fn present(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()>;
}

/// Creates a backend bound to a mount.
pub trait BackendFactory {
    type Mount: Mount;
    type Backend: RenderBackend;

    fn attach(
        &mut self,
        mount: &Self::Mount,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self::Backend>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Uninitialized,
    ContextReady,
    SceneReady,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("mount element '{0}' not found")]
    MountNotFound(String),
    #[error("{op} requires {required:?} but the renderer is {actual:?}")]
    Precondition {
        op: &'static str,
        required: RenderState,
        actual: RenderState,
    },
    #[error("rendering backend failed")]
    Backend(#[source] anyhow::Error),
}

struct Device<M, B> {
    mount: M,
    backend: B,
    size: (u32, u32),
}

/// Camera, scene root and the placeholder cube.
pub struct Stage {
    pub camera: Camera,
    pub scene: Scene,
    pub cube: DrawableId,
}

pub struct RenderContext<F: BackendFactory> {
    factory: F,
    device: Option<Device<F::Mount, F::Backend>>,
    stage: Option<Stage>,
}

impl<F: BackendFactory> RenderContext<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            device: None,
            stage: None,
        }
    }

    pub fn state(&self) -> RenderState {
        match (&self.device, &self.stage) {
            (None, _) => RenderState::Uninitialized,
            (Some(_), None) => RenderState::ContextReady,
            (Some(_), Some(_)) => RenderState::SceneReady,
        }
    }

    fn precondition(&self, op: &'static str, required: RenderState) -> RenderError {
        RenderError::Precondition {
            op,
            required,
            actual: self.state(),
        }
    }

    fn require(&self, op: &'static str, required: RenderState) -> Result<(), RenderError> {
        if self.state() == required {
            Ok(())
        } else {
            Err(self.precondition(op, required))
        }
    }

    /// Create the rendering backend on the mount named `mount_id`, sized to
    /// its current client size.
    pub fn init<D>(&mut self, document: &D, mount_id: &str) -> Result<(), RenderError>
    where
        D: Document<Mount = F::Mount>,
    {
        self.require("init", RenderState::Uninitialized)?;

        let mount = document
            .element_by_id(mount_id)
            .ok_or_else(|| RenderError::MountNotFound(mount_id.to_owned()))?;
        let (width, height) = mount.client_size();
        let backend = self
            .factory
            .attach(&mount, width, height)
            .map_err(RenderError::Backend)?;

        self.device = Some(Device {
            mount,
            backend,
            size: (width, height),
        });
        log::info!("Renderer initialized on '{}' ({}x{})", mount_id, width, height);
        Ok(())
    }

    /// Build the camera and the scene with its single cube. Aspect comes from
    /// the mount size at the time of the call.
    pub fn setup_scene(&mut self) -> Result<(), RenderError> {
        self.require("setup_scene", RenderState::ContextReady)?;
        let (width, height) = match self.device.as_ref() {
            Some(device) => device.mount.client_size(),
            None => return Err(self.precondition("setup_scene", RenderState::ContextReady)),
        };
        let aspect = Camera::aspect_for(width, height);
        let camera = Camera::from_fov_deg(FOV_Y_DEG, aspect, Z_NEAR, Z_FAR)
            .at_position(vec3(0.0, 0.0, CAMERA_DISTANCE));

        let mut scene = Scene::new();
        let cube = scene.add(Drawable::new(
            MeshKind::UnitCube,
            FlatMaterial::from_hex(CUBE_COLOR),
        ));

        self.stage = Some(Stage {
            camera,
            scene,
            cube,
        });
        log::info!("Scene setup complete");
        Ok(())
    }

    /// Advance the cube and present one frame.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let fault = self.precondition("render", RenderState::SceneReady);
        let (Some(device), Some(stage)) = (self.device.as_mut(), self.stage.as_mut()) else {
            return Err(fault);
        };

        // Follow the mount if it was resized since the last frame.
        let size = device.mount.client_size();
        if size != device.size {
            log::debug!("Mount resized: {}x{}", size.0, size.1);
            device.size = size;
            device.backend.resize(size.0.max(1), size.1.max(1));
            stage.camera.aspect = Camera::aspect_for(size.0, size.1);
        }

        if let Some(cube) = stage.scene.drawable_mut(stage.cube) {
            cube.transform
                .rotate_euler(Vec3::new(ROTATION_STEP, ROTATION_STEP, 0.0));
        }

        device
            .backend
            .present(&stage.scene, &stage.camera)
            .map_err(RenderError::Backend)
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    pub fn backend(&self) -> Option<&F::Backend> {
        self.device.as_ref().map(|d| &d.backend)
    }

    /// Euler rotation of the placeholder cube, once the scene exists.
    pub fn cube_rotation(&self) -> Option<Vec3> {
        let stage = self.stage.as_ref()?;
        stage
            .scene
            .drawable(stage.cube)
            .map(|d| d.transform.rotation_euler)
    }
}

impl<F: BackendFactory + 'static> RenderContext<F> {
    /// `Init` creates the context and the scene, `DrawWorld` renders a frame.
    pub fn install_hooks<D>(
        ctx: Rc<RefCell<Self>>,
        hooks: &mut PhaseHooks,
        document: D,
        mount_id: impl Into<String>,
    ) where
        D: Document<Mount = F::Mount> + 'static,
    {
        let mount_id = mount_id.into();
        let init_ctx = ctx.clone();
        hooks.hook(Phase::Init, move || {
            let mut ctx = init_ctx.borrow_mut();
            ctx.init(&document, &mount_id)?;
            ctx.setup_scene()?;
            Ok(())
        });
        hooks.hook(Phase::DrawWorld, move || {
            ctx.borrow_mut().render()?;
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct TestMount(Rc<Cell<(u32, u32)>>);

    impl TestMount {
        fn new(width: u32, height: u32) -> Self {
            Self(Rc::new(Cell::new((width, height))))
        }
    }

    impl Mount for TestMount {
        fn client_size(&self) -> (u32, u32) {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct TestDocument(HashMap<String, TestMount>);

    impl TestDocument {
        fn with(mut self, id: &str, mount: TestMount) -> Self {
            self.0.insert(id.to_owned(), mount);
            self
        }
    }

    impl Document for TestDocument {
        type Mount = TestMount;

        fn element_by_id(&self, id: &str) -> Option<TestMount> {
            self.0.get(id).cloned()
        }
    }

    /// Records the cube rotation of every presented frame.
    #[derive(Default)]
    struct RecordingBackend {
        size: (u32, u32),
        frames: Vec<Vec3>,
        aspects: Vec<f32>,
        fail: bool,
    }

    impl RenderBackend for RecordingBackend {
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn present(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail, "device lost");
            let cube = scene.drawables().next().expect("cube in scene");
            self.frames.push(cube.transform.rotation_euler);
            self.aspects.push(camera.aspect);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        attached: usize,
        fail: bool,
    }

    impl BackendFactory for RecordingFactory {
        type Mount = TestMount;
        type Backend = RecordingBackend;

        fn attach(
            &mut self,
            _mount: &TestMount,
            width: u32,
            height: u32,
        ) -> anyhow::Result<RecordingBackend> {
            anyhow::ensure!(!self.fail, "no adapter");
            self.attached += 1;
            Ok(RecordingBackend {
                size: (width, height),
                ..Default::default()
            })
        }
    }

    fn ready(width: u32, height: u32) -> (RenderContext<RecordingFactory>, TestMount) {
        let mount = TestMount::new(width, height);
        let doc = TestDocument::default().with(MAIN_MOUNT, mount.clone());
        let mut ctx = RenderContext::new(RecordingFactory::default());
        ctx.init(&doc, MAIN_MOUNT).expect("init");
        ctx.setup_scene().expect("setup");
        (ctx, mount)
    }

    #[test]
    fn init_then_setup_reaches_scene_ready() {
        let mount = TestMount::new(800, 600);
        let doc = TestDocument::default().with(MAIN_MOUNT, mount);
        let mut ctx = RenderContext::new(RecordingFactory::default());
        assert_eq!(ctx.state(), RenderState::Uninitialized);

        ctx.init(&doc, MAIN_MOUNT).unwrap();
        assert_eq!(ctx.state(), RenderState::ContextReady);
        assert_eq!(ctx.backend().unwrap().size, (800, 600));

        ctx.setup_scene().unwrap();
        assert_eq!(ctx.state(), RenderState::SceneReady);
        assert_eq!(ctx.stage().unwrap().scene.len(), 1);
    }

    #[test]
    fn camera_aspect_uses_mount_size_at_setup() {
        let mount = TestMount::new(800, 600);
        let doc = TestDocument::default().with(MAIN_MOUNT, mount.clone());
        let mut ctx = RenderContext::new(RecordingFactory::default());
        ctx.init(&doc, MAIN_MOUNT).unwrap();

        // Resized between init and setup: setup sees the new size.
        mount.0.set((1920, 1080));
        ctx.setup_scene().unwrap();

        let cam = ctx.stage().unwrap().camera;
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        assert!((cam.fov_y_rad - FOV_Y_DEG.to_radians()).abs() < 1e-6);
        assert_eq!((cam.z_near, cam.z_far), (Z_NEAR, Z_FAR));
        assert_eq!(cam.eye, vec3(0.0, 0.0, CAMERA_DISTANCE));
    }

    #[test]
    fn cube_is_green_unit_cube() {
        let (ctx, _) = ready(640, 480);
        let stage = ctx.stage().unwrap();
        let cube = stage.scene.drawable(stage.cube).unwrap();
        assert_eq!(cube.mesh, MeshKind::UnitCube);
        assert_eq!(cube.material.color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn each_render_advances_rotation_by_one_step() {
        let (mut ctx, _) = ready(640, 480);
        assert_eq!(ctx.cube_rotation(), Some(Vec3::ZERO));

        for _ in 0..3 {
            let before = ctx.cube_rotation().unwrap();
            ctx.render().unwrap();
            let after = ctx.cube_rotation().unwrap();
            assert!((after.x - before.x - ROTATION_STEP).abs() < 1e-6);
            assert!((after.y - before.y - ROTATION_STEP).abs() < 1e-6);
            assert_eq!(after.z, before.z);
        }

        let frames = &ctx.backend().unwrap().frames;
        assert_eq!(frames.len(), 3);
        assert!((frames[2].x - 3.0 * ROTATION_STEP).abs() < 1e-6);
    }

    #[test]
    fn render_before_setup_is_a_precondition_fault() {
        let mut ctx = RenderContext::new(RecordingFactory::default());
        let err = ctx.render().unwrap_err();
        assert!(matches!(
            err,
            RenderError::Precondition {
                op: "render",
                actual: RenderState::Uninitialized,
                ..
            }
        ));

        let doc = TestDocument::default().with(MAIN_MOUNT, TestMount::new(10, 10));
        ctx.init(&doc, MAIN_MOUNT).unwrap();
        let err = ctx.render().unwrap_err();
        assert!(matches!(
            err,
            RenderError::Precondition {
                actual: RenderState::ContextReady,
                ..
            }
        ));
        assert_eq!(ctx.state(), RenderState::ContextReady);
    }

    #[test]
    fn setup_before_init_is_a_precondition_fault() {
        let mut ctx = RenderContext::new(RecordingFactory::default());
        assert!(matches!(
            ctx.setup_scene(),
            Err(RenderError::Precondition { op: "setup_scene", .. })
        ));
        assert!(ctx.stage().is_none());
    }

    #[test]
    fn init_twice_is_rejected() {
        let (mut ctx, mount) = ready(10, 10);
        let doc = TestDocument::default().with(MAIN_MOUNT, mount);
        assert!(matches!(
            ctx.init(&doc, MAIN_MOUNT),
            Err(RenderError::Precondition { op: "init", .. })
        ));
        assert_eq!(ctx.state(), RenderState::SceneReady);
    }

    #[test]
    fn missing_mount_is_reported() {
        let mut ctx = RenderContext::new(RecordingFactory::default());
        let err = ctx.init(&TestDocument::default(), MAIN_MOUNT).unwrap_err();
        assert!(matches!(err, RenderError::MountNotFound(ref id) if id == MAIN_MOUNT));
        assert_eq!(ctx.state(), RenderState::Uninitialized);
    }

    #[test]
    fn backend_failures_surface_as_backend_errors() {
        let doc = TestDocument::default().with(MAIN_MOUNT, TestMount::new(10, 10));
        let mut ctx = RenderContext::new(RecordingFactory {
            fail: true,
            ..Default::default()
        });
        assert!(matches!(ctx.init(&doc, MAIN_MOUNT), Err(RenderError::Backend(_))));
        assert_eq!(ctx.state(), RenderState::Uninitialized);
    }

    #[test]
    fn resized_mount_updates_backend_and_aspect() {
        let (mut ctx, mount) = ready(800, 600);
        mount.0.set((1000, 500));
        ctx.render().unwrap();

        let backend = ctx.backend().unwrap();
        assert_eq!(backend.size, (1000, 500));
        assert!((backend.aspects[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn hooks_drive_init_and_draw() {
        let doc = TestDocument::default().with(MAIN_MOUNT, TestMount::new(320, 240));
        let ctx = Rc::new(RefCell::new(RenderContext::new(RecordingFactory::default())));
        let mut hooks = PhaseHooks::new();
        RenderContext::install_hooks(ctx.clone(), &mut hooks, doc, MAIN_MOUNT);

        pollster::block_on(hooks.run(Phase::Init)).expect("init phase");
        assert_eq!(ctx.borrow().state(), RenderState::SceneReady);

        for _ in 0..2 {
            pollster::block_on(hooks.run(Phase::DrawWorld)).unwrap();
        }
        assert_eq!(ctx.borrow().backend().unwrap().frames.len(), 2);
    }

    #[test]
    fn init_hook_reports_missing_mount() {
        let ctx = Rc::new(RefCell::new(RenderContext::new(RecordingFactory::default())));
        let mut hooks = PhaseHooks::new();
        RenderContext::install_hooks(ctx.clone(), &mut hooks, TestDocument::default(), MAIN_MOUNT);

        let err = pollster::block_on(hooks.run(Phase::Init)).unwrap_err();
        let corelib::CoreError::PhaseFailed { source, .. } = err;
        assert!(matches!(
            source.downcast_ref::<RenderError>(),
            Some(RenderError::MountNotFound(_))
        ));

        // Draw phase keeps going; the failure is logged, not panicked on.
        assert_eq!(pollster::block_on(hooks.run(Phase::DrawWorld)).unwrap(), 0);
    }
}
