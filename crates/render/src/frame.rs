use crate::backend::RenderBackend;
use crate::camera::Camera;
use crate::clock::FrameClock;
use crate::error::RenderError;
use crate::movement::MovementController;
use crate::renderer::{DrawStats, Renderer};
use crate::scene::Scene;
use meshview_common::EngineConfig;
use meshview_input::InputState;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub delta_seconds: f32,
    pub outcome: FrameOutcome,
    /// `None` when nothing was drawn.
    pub stats: Option<DrawStats>,
}

/// One iteration: time step, input, then drawing.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    pub clock: FrameClock,
    pub movement: MovementController,
    pub renderer: Renderer,
}

impl FrameLoop {
    pub fn new(clock: FrameClock, movement: MovementController, renderer: Renderer) -> Self {
        Self {
            clock,
            movement,
            renderer,
        }
    }

    pub fn from_config(config: &EngineConfig, start: Instant) -> Self {
        Self::new(
            FrameClock::new(start, config.render.max_frame_delta),
            MovementController::from_config(&config.movement),
            Renderer::from_config(config),
        )
    }

    /// Run one frame at time `now`.
    ///
    /// A held Quit action ends the frame before anything is drawn.
    pub fn run_frame<B: RenderBackend>(
        &mut self,
        now: Instant,
        input: &mut InputState,
        camera: &mut Camera,
        scene: &Scene,
        backend: &mut B,
    ) -> Result<FrameReport, RenderError> {
        let delta_seconds = self.clock.tick(now);
        self.process_input(delta_seconds, input, camera);

        if input.quit_requested() {
            tracing::info!("quit requested");
            return Ok(FrameReport {
                delta_seconds,
                outcome: FrameOutcome::Quit,
                stats: None,
            });
        }

        let stats = self.renderer.draw_frame(backend, camera, scene)?;
        Ok(FrameReport {
            delta_seconds,
            outcome: FrameOutcome::Continue,
            stats: Some(stats),
        })
    }

    /// Apply a pending mode switch and held movement, then turn the camera by the
    /// pointer movement gathered since the previous frame.
    pub fn process_input(&mut self, dt: f32, input: &mut InputState, camera: &mut Camera) {
        if input.take_mode_toggle() {
            let mode = self.movement.toggle_mode();
            tracing::info!(?mode, "camera mode changed");
        }
        self.movement.apply(camera, input, dt);

        // Checkpoint first: the delta covers all motion buffered since the previous
        // frame, so each pointer sample turns the camera exactly once.
        input.checkpoint();
        let delta = input.pointer_delta();
        if delta != glam::Vec2::ZERO {
            camera.update_orientation(delta.x, delta.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend};
    use meshview_common::CameraMode;
    use meshview_input::Action;
    use std::time::Duration;

    fn setup() -> (FrameLoop, InputState, Camera, Instant) {
        let config = EngineConfig::default();
        let start = Instant::now();
        (
            FrameLoop::from_config(&config, start),
            InputState::default(),
            Camera::from_config(&config.camera),
            start,
        )
    }

    #[test]
    fn quit_skips_drawing() {
        let (mut frame, mut input, mut camera, start) = setup();
        let mut backend = RecordingBackend::new();
        input.handle_action(Action::Quit, true, false);

        let report = frame
            .run_frame(start, &mut input, &mut camera, &Scene::new(), &mut backend)
            .unwrap();
        assert_eq!(report.outcome, FrameOutcome::Quit);
        assert!(report.stats.is_none());
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn normal_frame_draws_and_presents() {
        let (mut frame, mut input, mut camera, start) = setup();
        let mut backend = RecordingBackend::new();
        let report = frame
            .run_frame(
                start + Duration::from_millis(16),
                &mut input,
                &mut camera,
                &Scene::new(),
                &mut backend,
            )
            .unwrap();
        assert_eq!(report.outcome, FrameOutcome::Continue);
        assert!(report.stats.is_some());
        assert_eq!(backend.calls.first(), Some(&Call::Clear(frame.renderer.clear_color)));
        assert_eq!(backend.calls.last(), Some(&Call::Present));
    }

    #[test]
    fn movement_scales_with_clamped_delta() {
        let (mut frame, mut input, mut camera, start) = setup();
        input.handle_action(Action::MoveForward, true, false);

        // A five second stall moves as far as one max-length frame.
        let dt = frame.clock.tick(start + Duration::from_secs(5));
        frame.process_input(dt, &mut input, &mut camera);
        let expected = frame.movement.speed * frame.clock.max_delta();
        assert!((camera.position.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn pointer_delta_is_applied_once() {
        let (mut frame, mut input, mut camera, _) = setup();
        input.on_cursor_moved(100.0, 100.0);
        input.on_cursor_moved(140.0, 100.0);

        frame.process_input(0.0, &mut input, &mut camera);
        let turned = camera.yaw();
        assert!((turned - (270.0 + 40.0 * camera.sensitivity)).abs() < 1e-3);

        frame.process_input(0.0, &mut input, &mut camera);
        assert_eq!(camera.yaw(), turned);
    }

    #[test]
    fn mode_toggle_applies_before_movement() {
        let (mut frame, mut input, mut camera, _) = setup();
        input.handle_action(Action::ToggleCameraMode, true, false);
        input.handle_action(Action::Ascend, true, false);

        frame.process_input(0.5, &mut input, &mut camera);
        assert_eq!(frame.movement.mode, CameraMode::Walk);
        assert_eq!(camera.position, glam::Vec3::ZERO);
    }
}
