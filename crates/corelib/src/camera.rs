use crate::{Mat4, Vec3};

/// Simple perspective camera (right-handed, looks down -Z by default).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Camera at the origin looking down -Z, vertical FOV given in degrees.
    pub fn from_fov_deg(fov_y_deg: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        Self::new_perspective(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            fov_y_deg.to_radians(),
            z_near,
            z_far,
            aspect,
        )
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range is [0, 1], which is what wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Move the eye, keeping the viewing direction.
    #[inline]
    pub fn at_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn set_position(&mut self, position: Vec3) {
        let dir = self.target - self.eye;
        self.eye = position;
        self.target = position + dir;
    }

    /// Aspect ratio for a viewport; degenerate heights are clamped to 1px.
    #[inline]
    pub fn aspect_for(width: u32, height: u32) -> f32 {
        width as f32 / height.max(1) as f32
    }
}
