//! Declarative vertex layout: a list of (name, type, normalized) elements
//! from which byte offsets, stride and wgpu attribute bindings are derived.

use thiserror::Error;

/// Scalar/vector type of one vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Float,
    Float2,
    Float3,
    Float4,
    Mat3,
    Mat4,
    Int,
    Int2,
    Int3,
    Int4,
    Bool,
}

impl DataType {
    /// Byte size of one attribute of this type.
    pub const fn size(self) -> u64 {
        match self {
            DataType::Float => 4,
            DataType::Float2 => 4 * 2,
            DataType::Float3 => 4 * 3,
            DataType::Float4 => 4 * 4,
            DataType::Mat3 => 4 * 3 * 3,
            DataType::Mat4 => 4 * 4 * 4,
            DataType::Int => 4,
            DataType::Int2 => 4 * 2,
            DataType::Int3 => 4 * 3,
            DataType::Int4 => 4 * 4,
            DataType::Bool => 1,
        }
    }

    /// Components per shader input (a Mat3 arrives as 3 columns).
    pub const fn component_count(self) -> u32 {
        match self {
            DataType::Float | DataType::Int | DataType::Bool => 1,
            DataType::Float2 | DataType::Int2 => 2,
            DataType::Float3 | DataType::Mat3 | DataType::Int3 => 3,
            DataType::Float4 | DataType::Mat4 | DataType::Int4 => 4,
        }
    }

    fn vertex_format(self) -> Option<wgpu::VertexFormat> {
        match self {
            DataType::Float => Some(wgpu::VertexFormat::Float32),
            DataType::Float2 => Some(wgpu::VertexFormat::Float32x2),
            DataType::Float3 => Some(wgpu::VertexFormat::Float32x3),
            DataType::Float4 => Some(wgpu::VertexFormat::Float32x4),
            DataType::Int => Some(wgpu::VertexFormat::Sint32),
            DataType::Int2 => Some(wgpu::VertexFormat::Sint32x2),
            DataType::Int3 => Some(wgpu::VertexFormat::Sint32x3),
            DataType::Int4 => Some(wgpu::VertexFormat::Sint32x4),
            // Matrices span several attribute slots and bools have no
            // 8-bit scalar format; neither is used by any mesh we load.
            DataType::Mat3 | DataType::Mat4 | DataType::Bool => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutBindError {
    #[error("no single wgpu vertex format for {0:?}")]
    UnsupportedType(DataType),
    #[error("normalized {0:?} attributes have no 32-bit wgpu format")]
    UnsupportedNormalized(DataType),
}

/// One named attribute inside an interleaved vertex record.
///
/// `offset` is assigned by [`VertexLayout::new`]; elements are not usable
/// on their own.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexElement {
    pub name: String,
    pub ty: DataType,
    pub normalized: bool,
    size: u64,
    offset: u64,
}

impl VertexElement {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            normalized: false,
            size: ty.size(),
            offset: 0,
        }
    }

    pub fn normalized(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            normalized: true,
            ..Self::new(name, ty)
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Ordered, immutable description of one vertex buffer's record layout.
///
/// Offsets and total stride are computed exactly once, at construction;
/// there is no way to mutate elements afterward.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexLayout {
    elements: Vec<VertexElement>,
    stride: u64,
}

impl VertexLayout {
    pub fn new(mut elements: Vec<VertexElement>) -> Self {
        let mut offset = 0u64;
        for element in &mut elements {
            element.offset = offset;
            offset += element.size;
        }
        Self {
            elements,
            stride: offset,
        }
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}

/// Allocates shader locations for vertex buffers attached to one pipeline.
///
/// Each attached buffer's elements claim consecutive locations from a
/// shared counter; attaching another buffer continues where the previous
/// one stopped, mirroring how a GL vertex array object accumulates enabled
/// attribute indices.
#[derive(Default)]
pub struct AttributeBinder {
    next_location: u32,
    buffers: Vec<BoundBuffer>,
}

struct BoundBuffer {
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl AttributeBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one attribute slot per element of `layout`, advancing the
    /// shared location counter.
    pub fn attach(&mut self, layout: &VertexLayout) -> Result<(), LayoutBindError> {
        let mut attributes = Vec::with_capacity(layout.elements().len());
        for element in layout.elements() {
            if element.normalized {
                return Err(LayoutBindError::UnsupportedNormalized(element.ty));
            }
            let format = element
                .ty
                .vertex_format()
                .ok_or(LayoutBindError::UnsupportedType(element.ty))?;
            attributes.push(wgpu::VertexAttribute {
                format,
                offset: element.offset(),
                shader_location: self.next_location,
            });
            self.next_location += 1;
        }
        self.buffers.push(BoundBuffer {
            stride: layout.stride(),
            attributes,
        });
        Ok(())
    }

    /// Buffer layouts for `RenderPipelineDescriptor::vertex.buffers`, in
    /// attach order.
    pub fn buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.buffers
            .iter()
            .map(|buffer| wgpu::VertexBufferLayout {
                array_stride: buffer.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &buffer.attributes,
            })
            .collect()
    }

    pub fn next_location(&self) -> u32 {
        self.next_location
    }
}

/// Layout of [`crate::model::Vertex`]: the interleaved record every loaded
/// mesh uses.
pub fn mesh_vertex_layout() -> VertexLayout {
    VertexLayout::new(vec![
        VertexElement::new("position", DataType::Float3),
        VertexElement::new("normal", DataType::Float3),
        VertexElement::new("uv", DataType::Float2),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_sum_of_sizes_in_declaration_order() {
        let layout = VertexLayout::new(vec![
            VertexElement::new("a", DataType::Float3),
            VertexElement::new("b", DataType::Float2),
            VertexElement::new("c", DataType::Float4),
        ]);
        assert_eq!(layout.stride(), 12 + 8 + 16);
        let offsets: Vec<u64> = layout.elements().iter().map(|e| e.offset()).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
    }

    #[test]
    fn data_type_tables() {
        assert_eq!(DataType::Mat4.size(), 64);
        assert_eq!(DataType::Mat3.size(), 36);
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::Float4.component_count(), 4);
        assert_eq!(DataType::Int.component_count(), 1);
    }

    #[test]
    fn mesh_vertex_layout_matches_vertex_struct() {
        let layout = mesh_vertex_layout();
        assert_eq!(layout.stride(), 32);
        assert_eq!(layout.elements().len(), 3);
        assert_eq!(layout.elements()[2].offset(), 24);
    }

    #[test]
    fn locations_increase_across_attached_buffers() {
        let per_vertex = VertexLayout::new(vec![
            VertexElement::new("position", DataType::Float3),
            VertexElement::new("uv", DataType::Float2),
        ]);
        let second = VertexLayout::new(vec![VertexElement::new("tint", DataType::Float4)]);

        let mut binder = AttributeBinder::new();
        binder.attach(&per_vertex).unwrap();
        binder.attach(&second).unwrap();

        // The counter never resets between buffers.
        assert_eq!(binder.next_location(), 3);
        let layouts = binder.buffer_layouts();
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0].attributes[0].shader_location, 0);
        assert_eq!(layouts[0].attributes[1].shader_location, 1);
        assert_eq!(layouts[1].attributes[0].shader_location, 2);
        assert_eq!(layouts[0].array_stride, 20);
    }

    #[test]
    fn matrix_elements_are_rejected_at_bind_time() {
        let layout = VertexLayout::new(vec![VertexElement::new("m", DataType::Mat4)]);
        let mut binder = AttributeBinder::new();
        assert_eq!(
            binder.attach(&layout),
            Err(LayoutBindError::UnsupportedType(DataType::Mat4))
        );
    }

    #[test]
    fn normalized_elements_are_rejected_at_bind_time() {
        let layout =
            VertexLayout::new(vec![VertexElement::normalized("n", DataType::Float3)]);
        let mut binder = AttributeBinder::new();
        assert_eq!(
            binder.attach(&layout),
            Err(LayoutBindError::UnsupportedNormalized(DataType::Float3))
        );
    }
}
