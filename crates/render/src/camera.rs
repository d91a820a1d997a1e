use glam::{Mat4, Vec3};
use meshview_common::CameraConfig;

/// Pitch is kept strictly inside (-90, 90) so `front` never aligns with a Y world up.
pub const PITCH_LIMIT: f32 = 89.0;

/// First-person camera oriented by yaw and pitch in degrees.
///
/// `front`, `right` and `up` are derived from yaw, pitch and world up and are
/// recomputed whenever the orientation changes. Position is free to mutate.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub sensitivity: f32,
    yaw: f32,
    pitch: f32,
    world_up: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32, world_up: Vec3) -> Self {
        let mut camera = Self {
            position,
            sensitivity: CameraConfig::default().sensitivity,
            yaw: 0.0,
            pitch: 0.0,
            world_up: world_up.try_normalize().unwrap_or(Vec3::Y),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
        };
        camera.set_orientation(yaw, pitch);
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new(config.position, config.yaw, config.pitch, Vec3::Y);
        camera.sensitivity = config.sensitivity;
        camera
    }

    /// Turn the camera by a pointer delta in pixels.
    ///
    /// Positive `dy` (pointer moving down) pitches the view down.
    pub fn update_orientation(&mut self, dx: f32, dy: f32) {
        let yaw = self.yaw + dx * self.sensitivity;
        let pitch = self.pitch - dy * self.sensitivity;
        self.set_orientation(yaw, pitch);
    }

    /// Set yaw and pitch in degrees. Yaw wraps into [0, 360), pitch is clamped.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.yaw = wrap_degrees(yaw);
        }
        if pitch.is_finite() {
            self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_basis();
    }

    fn update_basis(&mut self) {
        let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();
        self.front = Vec3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
        // A world up that is not Y can still line up with front; any perpendicular will do.
        self.right = self
            .front
            .cross(self.world_up)
            .try_normalize()
            .unwrap_or_else(|| self.front.any_orthonormal_vector());
        self.up = self.right.cross(self.front).normalize();
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    /// Right-handed look-at matrix from the current position and orientation.
    pub fn view_transform(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Perspective projection with a 0..1 depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }
}

impl Projection {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_degrees: config.fov_degrees,
            aspect,
            near: config.near,
            far: config.far,
        }
    }

    /// Update the aspect ratio for a new framebuffer size. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}
