//! In-app editor shell: scene picker plus engine stats. Picking a scene
//! clears the layer list and repopulates it.

use std::path::PathBuf;

use renderer::GpuState;

use crate::layer::Layer;
use crate::scenes::{RayTracingLayer, SponzaLayer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneKind {
    Sponza,
    RayTracing,
}

impl SceneKind {
    pub const ALL: [SceneKind; 2] = [SceneKind::Sponza, SceneKind::RayTracing];

    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Sponza => "Sponza",
            SceneKind::RayTracing => "Ray tracing",
        }
    }

    /// Build the layer list for this scene.
    pub fn build_layers(self, gpu: &GpuState, model_path: &PathBuf) -> Vec<Box<dyn Layer>> {
        match self {
            SceneKind::Sponza => vec![Box::new(SponzaLayer::new("Sponza", gpu, model_path))],
            SceneKind::RayTracing => vec![Box::new(RayTracingLayer::new("Ray tracing"))],
        }
    }
}

/// Editor panel state.
pub struct Editor {
    pub scene: SceneKind,
    pub show_fps: bool,
    fps: f32,
}

impl Editor {
    pub fn new(show_fps: bool) -> Self {
        Self {
            scene: SceneKind::Sponza,
            show_fps,
            fps: 0.0,
        }
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps;
    }

    /// Draw the panel. Returns the scene to switch to, if the user picked a
    /// different one.
    pub fn ui(&mut self, egui_ctx: &egui::Context, camera_pos: corelib::Vec3) -> Option<SceneKind> {
        let mut requested = None;
        egui::Window::new("Editor").show(egui_ctx, |ui| {
            let mut selected = self.scene;
            egui::ComboBox::from_label("Scene")
                .selected_text(selected.label())
                .show_ui(ui, |ui| {
                    for kind in SceneKind::ALL {
                        ui.selectable_value(&mut selected, kind, kind.label());
                    }
                });
            if selected != self.scene {
                requested = Some(selected);
            }

            ui.separator();
            ui.label(format!(
                "camera: ({:.2}, {:.2}, {:.2})",
                camera_pos.x, camera_pos.y, camera_pos.z
            ));
            if self.show_fps {
                ui.label(format!("fps: {:.0}", self.fps));
            }
            ui.label("RMB: mouse look, WASD/QE: move, Esc: quit");
        });
        requested
    }
}
