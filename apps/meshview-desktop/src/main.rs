use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::{EulerRot, Quat};
use meshview_assets::load_model;
use meshview_common::{CameraMode, EngineConfig, ModelConfig};
use meshview_input::InputState;
use meshview_render::{Camera, FrameLoop, FrameOutcome, RenderError, Scene};
use meshview_render_wgpu::{BackendOptions, ShaderSource, WgpuBackend};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

#[derive(Parser)]
#[command(name = "meshview-desktop", about = "Interactive OBJ model viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// OBJ file to load; repeat for several models. Replaces models from the config file.
    #[arg(long = "model")]
    models: Vec<PathBuf>,

    /// Material library for the given models
    #[arg(long)]
    mtl: Option<PathBuf>,

    /// Camera movement mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// WGSL file replacing the built-in mesh shader
    #[arg(long)]
    shader: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    FreeFly,
    Walk,
}

impl From<ModeArg> for CameraMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FreeFly => CameraMode::FreeFly,
            ModeArg::Walk => CameraMode::Walk,
        }
    }
}

/// Load the config file, if any, and apply command-line overrides.
fn effective_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if !cli.models.is_empty() {
        config.models = cli
            .models
            .iter()
            .map(|obj| ModelConfig {
                mtl: cli.mtl.clone(),
                ..ModelConfig::from_path(obj)
            })
            .collect();
    } else if let Some(mtl) = &cli.mtl {
        match config.models.first_mut() {
            Some(first) => first.mtl = Some(mtl.clone()),
            None => tracing::warn!("--mtl given without any model"),
        }
    }
    if let Some(mode) = cli.mode {
        config.movement.mode = mode.into();
    }
    if let Some(shader) = &cli.shader {
        config.render.shader = Some(shader.clone());
    }

    dedupe_names(&mut config.models);
    config.validate()?;
    Ok(config)
}

/// Scene objects are keyed by name; suffix repeats so no model replaces another.
fn dedupe_names(models: &mut [ModelConfig]) {
    let mut seen = HashSet::new();
    for model in models {
        if seen.insert(model.name.clone()) {
            continue;
        }
        let base = model.name.clone();
        let mut n = 2;
        while !seen.insert(format!("{base}-{n}")) {
            n += 1;
        }
        model.name = format!("{base}-{n}");
    }
}

/// How pointer movement reaches the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerMode {
    /// Cursor visible and free; absolute positions drive the camera.
    Free,
    /// Cursor grabbed; raw device motion drives the camera.
    Grabbed,
}

struct App {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    scene: Scene,
    camera: Camera,
    input: InputState,
    frame_loop: FrameLoop,
    pointer: PointerMode,
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        let camera = Camera::from_config(&config.camera);
        let frame_loop = FrameLoop::from_config(&config, Instant::now());
        Self {
            config,
            window: None,
            backend: None,
            scene: Scene::new(),
            camera,
            input: InputState::default(),
            frame_loop,
            pointer: PointerMode::Free,
            startup_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.window.title.as_str())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);
        let size = window.inner_size();

        let options = BackendOptions {
            vsync: self.config.render.vsync,
            shader: ShaderSource::from_path(self.config.render.shader.as_deref()),
        };
        let mut backend = WgpuBackend::new(window.clone(), size.width, size.height, &options)
            .context("initialize GPU backend")?;
        self.frame_loop.renderer.set_viewport(size.width, size.height);

        for model in &self.config.models {
            load_into_scene(&mut self.scene, &mut backend, model);
        }
        if self.scene.is_empty() {
            tracing::warn!("no models loaded; pass --model <file.obj>");
        }

        if self.config.window.grab_cursor {
            self.grab_pointer(&window);
        }
        self.window = Some(window);
        self.backend = Some(backend);
        // Loading time should not count as the first frame's delta.
        self.frame_loop.clock.tick(Instant::now());
        Ok(())
    }

    fn grab_pointer(&mut self, window: &Window) {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        self.pointer = match grabbed {
            Ok(()) => PointerMode::Grabbed,
            Err(e) => {
                tracing::warn!("cursor grab unavailable, using absolute pointer: {e}");
                PointerMode::Free
            }
        };
        window.set_cursor_visible(self.pointer == PointerMode::Free);
        self.input.reacquire_pointer();
    }

    fn release_pointer(&mut self, window: &Window) {
        if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            tracing::debug!("cursor release failed: {e}");
        }
        window.set_cursor_visible(true);
        self.pointer = PointerMode::Free;
        self.input.reacquire_pointer();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(backend), Some(window)) = (self.backend.as_mut(), self.window.as_ref()) else {
            return;
        };

        let result = self.frame_loop.run_frame(
            Instant::now(),
            &mut self.input,
            &mut self.camera,
            &self.scene,
            backend,
        );
        match result {
            Ok(report) if report.outcome == FrameOutcome::Quit => event_loop.exit(),
            Ok(_) => {
                let clock = &self.frame_loop.clock;
                if clock.frame_count() % 30 == 0 {
                    window.set_title(&format!(
                        "{} | {:.0} fps | {:?}",
                        self.config.window.title,
                        clock.fps(),
                        self.frame_loop.movement.mode
                    ));
                }
            }
            Err(e @ RenderError::Surface(_)) => {
                tracing::error!("{e}");
                event_loop.exit();
            }
            Err(e) => tracing::error!("frame failed: {e}"),
        }
    }
}

fn load_into_scene(scene: &mut Scene, backend: &mut WgpuBackend, model: &ModelConfig) {
    let asset = match load_model(&model.name, &model.obj, model.mtl.as_deref()) {
        Ok(asset) => asset,
        Err(e) => {
            tracing::error!(model = %model.name, "failed to load model: {e}");
            return;
        }
    };
    match scene.load_model(backend, &model.name, &asset) {
        Ok(object) => {
            let r = model.rotation_degrees;
            object.set_position(model.position);
            object.set_scale(model.scale);
            object.set_rotation(Quat::from_euler(
                EulerRot::YXZ,
                r.y.to_radians(),
                r.x.to_radians(),
                r.z.to_radians(),
            ));
        }
        Err(e) => tracing::error!(model = %model.name, "failed to upload model: {e}"),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("{e:#}");
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(backend) = &mut self.backend {
                    backend.resize(new_size.width, new_size.height);
                }
                self.frame_loop
                    .renderer
                    .set_viewport(new_size.width, new_size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                self.input
                    .handle_key(key, state == ElementState::Pressed, repeat);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.pointer == PointerMode::Free {
                    self.input.on_cursor_moved(position.x, position.y);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                if self.config.window.grab_cursor && self.pointer == PointerMode::Free {
                    if let Some(window) = self.window.clone() {
                        self.grab_pointer(&window);
                    }
                }
            }
            WindowEvent::Focused(focused) => {
                let Some(window) = self.window.clone() else {
                    return;
                };
                if focused {
                    if self.config.window.grab_cursor {
                        self.grab_pointer(&window);
                    }
                } else {
                    self.input.release_all();
                    self.release_pointer(&window);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.pointer == PointerMode::Grabbed {
                self.input.on_pointer_motion(delta.0, delta.1);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = effective_config(&cli)?;
    tracing::info!(
        models = config.models.len(),
        mode = ?config.movement.mode,
        "meshview-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("meshview-desktop").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_without_arguments() {
        let config = effective_config(&cli(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn model_flags_replace_config_models() {
        let config = effective_config(&cli(&[
            "--model",
            "assets/crate.obj",
            "--model",
            "other/crate.obj",
            "--mtl",
            "shared.mtl",
            "--mode",
            "walk",
        ]))
        .unwrap();
        let names: Vec<_> = config.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["crate", "crate-2"]);
        assert!(config.models.iter().all(|m| m.mtl == Some(PathBuf::from("shared.mtl"))));
        assert_eq!(config.movement.mode, CameraMode::Walk);
    }

    #[test]
    fn shader_flag_overrides_config() {
        let config = effective_config(&cli(&["--shader", "custom.wgsl"])).unwrap();
        assert_eq!(config.render.shader, Some(PathBuf::from("custom.wgsl")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(effective_config(&cli(&["--config", "/nonexistent/meshview.json"])).is_err());
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshview.json");
        std::fs::write(&path, r#"{ "movement": { "speed": -3.0 } }"#).unwrap();
        let err = effective_config(&cli(&["--config", path.to_str().unwrap()])).unwrap_err();
        assert!(err.to_string().contains("movement.speed"));
    }

    #[test]
    fn dedupe_skips_taken_suffixes() {
        let mut models: Vec<_> = ["a", "a-2", "a"]
            .iter()
            .map(|n| ModelConfig::from_path(format!("{n}.obj")))
            .collect();
        dedupe_names(&mut models);
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["a", "a-2", "a-3"]);
    }
}
