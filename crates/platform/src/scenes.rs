//! Demo scenes. Sponza is the model-viewer workhorse; ray tracing is the
//! same stub it always was.

use std::path::Path;
use std::sync::Arc;

use corelib::transform::Transform;
use corelib::{Vec3, vec3};
use renderer::{Draw, GpuModel, GpuState};

use crate::layer::{FrameContext, Layer};

/// Model-viewer scene: the configured OBJ plus an orbiting light marker.
pub struct SponzaLayer {
    name: String,
    model: Arc<GpuModel>,
    light_marker: Arc<GpuModel>,
    model_scale: f32,
    time: f32,
    used_placeholder: bool,
}

impl SponzaLayer {
    /// Loads and uploads the scene model. A load failure is logged and the
    /// placeholder cube takes its place; the editor stays usable.
    pub fn new(name: impl Into<String>, gpu: &GpuState, model_path: &Path) -> Self {
        let (model_data, used_placeholder) = match asset::load_model_from_path(model_path) {
            Ok(data) => (data, false),
            Err(err) => {
                log::error!(
                    "failed to load model {}: {err}; substituting placeholder cube",
                    model_path.display()
                );
                (asset::ModelData::placeholder_cube(), true)
            }
        };
        log::info!(
            "model {}: {} group(s), {} vertices, {} triangles",
            model_path.display(),
            model_data.groups.len(),
            model_data.vertex_count(),
            model_data.triangle_count()
        );

        let model = Arc::new(gpu.upload_model(&model_data, &model_path.display().to_string()));
        let light_marker =
            Arc::new(gpu.upload_model(&asset::ModelData::placeholder_cube(), "light marker"));

        // Sponza is exported in centimeters; the placeholder cube isn't.
        let model_scale = if used_placeholder { 1.0 } else { 0.02 };

        Self {
            name: name.into(),
            model,
            light_marker,
            model_scale,
            time: 0.0,
            used_placeholder,
        }
    }
}

impl Layer for SponzaLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.time += ctx.dt;

        let light_pos = vec3(
            2.0 * self.time.sin(),
            1.0,
            1.5 * self.time.cos(),
        );
        *ctx.light_pos = light_pos;

        ctx.draws.push(Draw {
            model: self.model.clone(),
            transform: Transform::from_uniform_scale(self.model_scale).matrix(),
        });
        ctx.draws.push(Draw {
            model: self.light_marker.clone(),
            transform: Transform::from_trs(light_pos, Vec3::ZERO, Vec3::splat(0.2)).matrix(),
        });
    }

    fn on_ui_render(&mut self, egui_ctx: &egui::Context) {
        egui::Window::new(self.name.clone()).show(egui_ctx, |ui| {
            ui.label(format!("draw groups: {}", self.model.group_count()));
            if self.used_placeholder {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "model failed to load; showing placeholder cube",
                );
            }
            ui.add(
                egui::Slider::new(&mut self.model_scale, 0.001..=2.0)
                    .logarithmic(true)
                    .text("model scale"),
            );
        });
    }
}

/// Placeholder scene; nothing is traced yet.
pub struct RayTracingLayer {
    name: String,
}

impl RayTracingLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Layer for RayTracingLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, _ctx: &mut FrameContext<'_>) {}

    fn on_ui_render(&mut self, egui_ctx: &egui::Context) {
        egui::Window::new(self.name.clone()).show(egui_ctx, |ui| {
            ui.label("Ray tracing scene is not implemented yet.");
        });
    }
}
