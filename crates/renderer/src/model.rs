//! GPU-side model: one vertex/index buffer pair and one material bind group
//! per non-empty material group.

use std::{collections::HashMap, path::PathBuf, rc::Rc};

use asset::texture::TextureData;
use asset::{MeshVertex, ModelData, TextureKind};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue};

use crate::texture::GpuTexture;

/// Interleaved vertex record uploaded to the GPU. Field order must match
/// [`crate::layout::mesh_vertex_layout`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl From<MeshVertex> for Vertex {
    fn from(v: MeshVertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

struct GpuMeshGroup {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    material_bg: BindGroup,
}

/// Uploaded model, ready for draw submission.
pub struct GpuModel {
    groups: Vec<GpuMeshGroup>,
}

impl GpuModel {
    /// Upload every non-empty group of `model`. Groups with no geometry get
    /// no GPU resources at all. Texture files that fail to decode are
    /// replaced by a checkerboard and logged; a missing slot binds white.
    pub fn upload(
        device: &Device,
        queue: &Queue,
        material_layout: &BindGroupLayout,
        sampler: &wgpu::Sampler,
        white: &GpuTexture,
        model: &ModelData,
        label: &str,
    ) -> Self {
        // Sponza-style models reuse texture files across materials.
        let mut cache: HashMap<PathBuf, Rc<GpuTexture>> = HashMap::new();

        let mut groups = Vec::new();
        for (group_index, group) in model.groups.iter().enumerate() {
            if group.is_empty() {
                continue;
            }

            let vertices: Vec<Vertex> = group.vertices.iter().copied().map(Vertex::from).collect();
            let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} VB group {group_index}")),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });
            let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} IB group {group_index}")),
                contents: bytemuck::cast_slice(&group.indices),
                usage: BufferUsages::INDEX,
            });

            // Fixed slots: diffuse first, specular second.
            let mut diffuse: Option<Rc<GpuTexture>> = None;
            let mut specular: Option<Rc<GpuTexture>> = None;
            for texture_ref in &group.textures {
                let gpu = cache
                    .entry(texture_ref.path.clone())
                    .or_insert_with(|| {
                        Rc::new(load_or_fallback(device, queue, &texture_ref.path))
                    })
                    .clone();
                match texture_ref.kind {
                    TextureKind::Diffuse => diffuse = Some(gpu),
                    TextureKind::Specular => specular = Some(gpu),
                }
            }

            let material_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} material group {group_index}")),
                layout: material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &diffuse.as_deref().unwrap_or(white).view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            &specular.as_deref().unwrap_or(white).view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

            groups.push(GpuMeshGroup {
                vertex_buf,
                index_buf,
                index_count: group.indices.len() as u32,
                material_bg,
            });
        }

        log::info!(
            "uploaded model '{}': {} draw group(s), {} unique texture(s)",
            label,
            groups.len(),
            cache.len()
        );
        Self { groups }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Record one indexed draw per group into `rpass`. Bind groups 0 and 1
    /// (camera, model matrix) must already be set by the caller.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        for group in &self.groups {
            rpass.set_bind_group(2, &group.material_bg, &[]);
            rpass.set_vertex_buffer(0, group.vertex_buf.slice(..));
            rpass.set_index_buffer(group.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..group.index_count, 0, 0..1);
        }
    }
}

fn load_or_fallback(device: &Device, queue: &Queue, path: &std::path::Path) -> GpuTexture {
    let data = match TextureData::load_from_path(path) {
        Ok(data) => data,
        Err(err) => {
            log::warn!("texture load failed, using checkerboard: {err}");
            TextureData::checkerboard(64)
        }
    };
    GpuTexture::from_data(device, queue, &data, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_matches_declared_layout() {
        // The Pod struct and the declarative layout must agree on stride.
        assert_eq!(
            std::mem::size_of::<Vertex>() as u64,
            crate::layout::mesh_vertex_layout().stride()
        );
    }

    #[test]
    fn vertex_conversion_is_field_for_field() {
        let src = MeshVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25]);
        let v = Vertex::from(src);
        assert_eq!(v.position, src.position);
        assert_eq!(v.normal, src.normal);
        assert_eq!(v.uv, src.uv);
    }
}
