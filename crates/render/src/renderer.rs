use crate::backend::{RenderBackend, UniformValue};
use crate::camera::{Camera, Projection};
use crate::error::RenderError;
use crate::scene::Scene;
use glam::Vec3;
use meshview_common::EngineConfig;
use std::collections::HashSet;

/// Directional light fed to the shading program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Direction the light travels, world space.
    pub direction: Vec3,
    pub ambient: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
            ambient: 0.25,
        }
    }
}

/// Counters for one drawn frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub objects: usize,
    pub triangles: usize,
    pub skipped_uniforms: usize,
    pub skipped_objects: usize,
}

/// Submits a scene to a backend, one frame at a time.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub projection: Projection,
    pub clear_color: [f32; 4],
    pub lighting: Lighting,
    reported_uniforms: HashSet<String>,
}

impl Renderer {
    pub fn new(projection: Projection, clear_color: [f32; 4]) -> Self {
        Self {
            projection,
            clear_color,
            lighting: Lighting::default(),
            reported_uniforms: HashSet::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let aspect = config.window.width.max(1) as f32 / config.window.height.max(1) as f32;
        Self::new(
            Projection::from_config(&config.camera, aspect),
            config.render.clear_color,
        )
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.projection.set_viewport(width, height);
    }

    /// Clear, bind the program, upload camera uniforms, draw every object, present.
    ///
    /// Unknown uniforms and unresolvable objects are skipped; anything else aborts
    /// the frame.
    pub fn draw_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        camera: &Camera,
        scene: &Scene,
    ) -> Result<DrawStats, RenderError> {
        let mut stats = DrawStats::default();
        backend.clear(self.clear_color)?;
        backend.bind_program()?;

        let uniforms = [
            ("projection", UniformValue::Mat4(self.projection.matrix())),
            ("view", UniformValue::Mat4(camera.view_transform())),
            ("light_dir", UniformValue::Vec3(self.lighting.direction)),
            ("ambient", UniformValue::Float(self.lighting.ambient)),
        ];
        for (name, value) in uniforms {
            match backend.set_uniform(name, value) {
                Ok(()) => {}
                Err(e) if e.is_lookup() => {
                    stats.skipped_uniforms += 1;
                    if self.reported_uniforms.insert(name.to_string()) {
                        tracing::warn!(uniform = name, "skipping uniform: {e}");
                    } else {
                        tracing::debug!(uniform = name, "skipping uniform: {e}");
                    }
                }
                Err(e) => return Err(e),
            }
        }

        for (name, object) in scene.iter() {
            match backend.draw_indexed(&object.draw_call()) {
                Ok(()) => {
                    stats.objects += 1;
                    stats.triangles += object.triangle_count() as usize;
                }
                Err(e) if e.is_lookup() => {
                    stats.skipped_objects += 1;
                    tracing::warn!(object = name, "skipping draw: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        backend.present()?;
        tracing::trace!(objects = stats.objects, triangles = stats.triangles, "frame presented");
        Ok(stats)
    }
}
