use crate::camera::Camera;
use glam::Vec3;
use meshview_common::{CameraMode, MovementConfig};
use meshview_input::{Action, InputState};

/// Turns held movement actions into camera displacement.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementController {
    pub mode: CameraMode,
    /// Units per second.
    pub speed: f32,
    pub sprint_multiplier: f32,
}

impl Default for MovementController {
    fn default() -> Self {
        Self::from_config(&MovementConfig::default())
    }
}

impl MovementController {
    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            mode: config.mode,
            speed: config.speed,
            sprint_multiplier: config.sprint_multiplier,
        }
    }

    pub fn current_speed(&self, sprint: bool) -> f32 {
        if sprint {
            self.speed * self.sprint_multiplier
        } else {
            self.speed
        }
    }

    /// Displacement for one frame of `dt` seconds.
    ///
    /// Opposing actions cancel. Diagonal input is not normalized.
    pub fn displacement(&self, camera: &Camera, input: &InputState, dt: f32) -> Vec3 {
        let front = camera.front();
        let forward = match self.mode {
            CameraMode::FreeFly => front,
            CameraMode::Walk => Vec3::new(front.x, 0.0, front.z).normalize_or_zero(),
        };

        let mut direction = Vec3::ZERO;
        if input.is_active(Action::MoveForward) {
            direction += forward;
        }
        if input.is_active(Action::MoveBackward) {
            direction -= forward;
        }
        if input.is_active(Action::MoveRight) {
            direction += camera.right();
        }
        if input.is_active(Action::MoveLeft) {
            direction -= camera.right();
        }
        if self.mode == CameraMode::FreeFly {
            if input.is_active(Action::Ascend) {
                direction += camera.up();
            }
            if input.is_active(Action::Descend) {
                direction -= camera.up();
            }
        }

        direction * self.current_speed(input.sprint_enabled()) * dt
    }

    /// Move the camera and return the displacement applied.
    pub fn apply(&self, camera: &mut Camera, input: &InputState, dt: f32) -> Vec3 {
        let delta = self.displacement(camera, input, dt);
        camera.position += delta;
        delta
    }

    pub fn toggle_mode(&mut self) -> CameraMode {
        self.mode = self.mode.toggled();
        self.mode
    }
}
