//! Layers: polymorphic scenes updated and UI-rendered once per frame.

use corelib::Vec3;
use corelib::camera::Camera;
use renderer::Draw;

/// Everything a layer may touch during one frame.
pub struct FrameContext<'a> {
    pub dt: f32,
    pub camera: &'a Camera,
    /// Draw calls queued for this frame; layers append.
    pub draws: &'a mut Vec<Draw>,
    /// World-space point light, owned by whichever scene sets it last.
    pub light_pos: &'a mut Vec3,
}

pub trait Layer {
    fn name(&self) -> &str;

    /// Advance simulation and queue draw calls.
    fn update(&mut self, ctx: &mut FrameContext<'_>);

    /// Contribute to the egui frame.
    fn on_ui_render(&mut self, egui_ctx: &egui::Context);
}
