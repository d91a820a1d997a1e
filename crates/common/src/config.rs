//! Engine configuration, loadable from a JSON file.
//!
//! Every section uses `#[serde(default)]`, so a file only needs to name the
//! values it overrides.

use crate::types::CameraMode;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub movement: MovementConfig,
    pub render: RenderConfig,
    pub models: Vec<ModelConfig>,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| {
                ConfigError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the projection, movement or window setup cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return invalid(format!(
                "window size {}x{} must be non-zero",
                window.width, window.height
            ));
        }

        let camera = &self.camera;
        if !camera.position.is_finite() || !camera.yaw.is_finite() || !camera.pitch.is_finite() {
            return invalid("camera position and angles must be finite".into());
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return invalid(format!(
                "camera.fov_degrees {} must be in (0, 180)",
                camera.fov_degrees
            ));
        }
        if !(camera.near > 0.0 && camera.far > camera.near && camera.far.is_finite()) {
            return invalid(format!(
                "camera planes near={} far={} need 0 < near < far",
                camera.near, camera.far
            ));
        }
        if !(camera.sensitivity.is_finite() && camera.sensitivity >= 0.0) {
            return invalid(format!(
                "camera.sensitivity {} must be finite and non-negative",
                camera.sensitivity
            ));
        }

        let movement = &self.movement;
        if !(movement.speed.is_finite() && movement.speed >= 0.0) {
            return invalid(format!(
                "movement.speed {} must be finite and non-negative",
                movement.speed
            ));
        }
        if !(movement.sprint_multiplier.is_finite() && movement.sprint_multiplier > 0.0) {
            return invalid(format!(
                "movement.sprint_multiplier {} must be finite and positive",
                movement.sprint_multiplier
            ));
        }

        if !(self.render.max_frame_delta.is_finite() && self.render.max_frame_delta > 0.0) {
            return invalid(format!(
                "render.max_frame_delta {} must be finite and positive",
                self.render.max_frame_delta
            ));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Hide and confine the cursor while the window has focus.
    pub grab_cursor: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "meshview".into(),
            width: 1280,
            height: 720,
            grab_cursor: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Degrees.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    /// Degrees of yaw/pitch per pixel of pointer motion.
    pub sensitivity: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: -90.0,
            pitch: 0.0,
            sensitivity: 0.075,
            fov_degrees: 60.0,
            near: 0.1,
            far: 2000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub mode: CameraMode,
    /// World units per second.
    pub speed: f32,
    /// Applied while the sprint toggle is on.
    pub sprint_multiplier: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::FreeFly,
            speed: 12.0,
            sprint_multiplier: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: [f32; 4],
    /// Custom WGSL shader; the built-in mesh shader is used when unset.
    pub shader: Option<PathBuf>,
    /// Upper bound on a single frame's delta time, in seconds.
    pub max_frame_delta: f32,
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.52, 0.80, 0.96, 1.0],
            shader: None,
            max_frame_delta: 0.1,
            vsync: true,
        }
    }
}

/// A model to load at startup and where to place it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub obj: PathBuf,
    #[serde(default)]
    pub mtl: Option<PathBuf>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    /// Euler angles in degrees (applied Y, then X, then Z).
    #[serde(default)]
    pub rotation_degrees: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl ModelConfig {
    /// A model named after its file stem, placed at the origin.
    pub fn from_path(obj: impl Into<PathBuf>) -> Self {
        let obj = obj.into();
        let name = obj
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".into());
        Self {
            name,
            obj,
            mtl: None,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_degrees: Vec3::ZERO,
        }
    }
}
