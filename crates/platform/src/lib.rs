//! Platform layer: windowing, event loop, input plumbing, layer shell.
//!
//! Owns the winit application state: window + GPU state are created on
//! `resumed`, egui gets first refusal on window events, and each redraw
//! updates the camera, runs the layers and submits one frame.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use corelib::camera::{Camera, CameraInput};
use corelib::{Vec3, vec3};
use renderer::{Draw, EguiFrame, GpuState};

pub mod editor;
pub mod layer;
pub mod scenes;

use editor::{Editor, SceneKind};
use layer::{FrameContext, Layer};

/// Startup configuration, parsed from the CLI by the app crate.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub model_path: PathBuf,
    pub show_fps: bool,
}

/// Run the engine until the window closes.
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated with error")?;
    Ok(())
}

struct App {
    config: AppConfig,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,

    camera: Camera,
    pressed: HashSet<KeyCode>,
    light_pos: Vec3,

    layers: Vec<Box<dyn Layer>>,
    editor: Editor,
    pending_scene: Option<SceneKind>,

    last_frame: Instant,
    fps_frames: u32,
    fps_accum: f32,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let aspect = config.width as f32 / config.height.max(1) as f32;
        let show_fps = config.show_fps;
        Self {
            config,
            window: None,
            gpu: None,
            egui_state: None,
            camera: Camera::new(vec3(-8.0, 2.0, 0.0), aspect),
            pressed: HashSet::new(),
            light_pos: vec3(0.0, 1.0, 0.0),
            layers: Vec::new(),
            editor: Editor::new(show_fps),
            pending_scene: None,
            last_frame: Instant::now(),
            fps_frames: 0,
            fps_accum: 0.0,
        }
    }

    fn camera_input(&self) -> CameraInput {
        CameraInput {
            forward: self.pressed.contains(&KeyCode::KeyW),
            backward: self.pressed.contains(&KeyCode::KeyS),
            left: self.pressed.contains(&KeyCode::KeyA),
            right: self.pressed.contains(&KeyCode::KeyD),
            up: self.pressed.contains(&KeyCode::KeyQ),
            down: self.pressed.contains(&KeyCode::KeyE),
        }
    }

    fn switch_scene(&mut self, kind: SceneKind) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        log::info!("switching scene to {}", kind.label());
        self.layers.clear();
        self.layers = kind.build_layers(gpu, &self.config.model_path);
        self.editor.scene = kind;
    }

    fn redraw(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.fps_frames += 1;
        self.fps_accum += dt;
        if self.fps_accum >= 1.0 {
            let fps = self.fps_frames as f32 / self.fps_accum;
            self.editor.set_fps(fps);
            if self.config.show_fps {
                log::info!("fps: {fps:.0}");
            }
            self.fps_frames = 0;
            self.fps_accum = 0.0;
        }

        self.camera.process_movement(self.camera_input(), dt);

        // --- egui frame
        let (raw_input, egui_ctx) = match self.egui_state.as_mut() {
            Some(state) => (state.take_egui_input(&window), state.egui_ctx().clone()),
            None => return,
        };
        egui_ctx.begin_pass(raw_input);

        let requested = self.editor.ui(&egui_ctx, self.camera.position);
        for layer in &mut self.layers {
            layer.on_ui_render(&egui_ctx);
        }

        let full_output = egui_ctx.end_pass();
        if let Some(egui_state) = self.egui_state.as_mut() {
            egui_state.handle_platform_output(&window, full_output.platform_output);
        }
        let primitives = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        // --- layer update & draw submission
        let mut draws: Vec<Draw> = Vec::new();
        {
            let mut ctx = FrameContext {
                dt,
                camera: &self.camera,
                draws: &mut draws,
                light_pos: &mut self.light_pos,
            };
            for layer in &mut self.layers {
                layer.update(&mut ctx);
            }
        }

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let egui_frame = EguiFrame {
            textures_delta: full_output.textures_delta,
            primitives,
            pixels_per_point: full_output.pixels_per_point,
        };
        match gpu.render(&self.camera, self.light_pos, &draws, Some(egui_frame)) {
            Ok(()) => {}
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("surface lost; recreating");
                gpu.recreate_surface();
            }
            Err(err) => {
                log::error!("render error: {err:?}");
            }
        }

        if let Some(kind) = requested {
            self.pending_scene = Some(kind);
        }
        if let Some(kind) = self.pending_scene.take() {
            self.switch_scene(kind);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Constantia")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("Failed to create window"),
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends));
        self.camera.set_aspect(gpu.aspect());

        let egui_state = egui_winit::State::new(
            egui::Context::default(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.last_frame = Instant::now();

        self.switch_scene(SceneKind::Sponza);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // egui gets first refusal on anything aimed at its widgets.
        if let (Some(window), Some(egui_state)) = (self.window.as_ref(), self.egui_state.as_mut())
        {
            if egui_state.on_window_event(window, &event).consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                    self.camera.set_aspect(gpu.aspect());
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {scale_factor:.3}");
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape && event.state.is_pressed() {
                        event_loop.exit();
                        return;
                    }
                    match event.state {
                        ElementState::Pressed => {
                            self.pressed.insert(code);
                        }
                        ElementState::Released => {
                            self.pressed.remove(&code);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Right {
                    self.camera.set_enabled(state.is_pressed());
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.camera.process_mouse(position.x as f32, position.y as f32);
            }
            WindowEvent::Focused(false) => {
                // Avoid stuck movement keys after alt-tab.
                self.pressed.clear();
                self.camera.set_enabled(false);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
