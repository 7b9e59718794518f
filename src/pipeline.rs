// ============================================================================
// pipeline.rs - wavetank
// GPU display paths and bind-group-layout helpers. One path per engine
// shape: a fullscreen texture quad for single-output engines, a
// triangulated grid mesh with a channel selector for multi-output ones.
// ============================================================================

use wgpu::util::DeviceExt;

use crate::config::{RunConfig, SimKind};
use crate::field::FieldView;

// ======================== Uniforms ========================

/// Uniform block for the mesh path: bounding-box fit plus the selector
/// deciding which color channel carries the field.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshParams {
    /// `(x0, 1/(x1-x0), y0, 1/(y1-y0))`
    pub bbox: [f32; 4],
    pub chosen_field: u32,
    pub _pad: [u32; 3],
}

// ======================== Display Paths ========================

/// Whichever display path the configured engine needs. Both expose the
/// same three calls: `upload` the frame's field view, rewrite the
/// `set_chosen_field` selector, and `draw` into an open render pass.
pub enum Display {
    Quad(QuadDisplay),
    Mesh(MeshDisplay),
}

impl Display {
    pub fn upload(&self, queue: &wgpu::Queue, view: FieldView<'_>) {
        match self {
            Display::Quad(quad) => quad.upload(queue, view),
            Display::Mesh(mesh) => mesh.upload(queue, view),
        }
    }

    pub fn set_chosen_field(&self, queue: &wgpu::Queue, index: usize) {
        match self {
            // Single output; there is nothing to select.
            Display::Quad(_) => {}
            Display::Mesh(mesh) => mesh.set_chosen_field(queue, index),
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        match self {
            Display::Quad(quad) => quad.draw(pass),
            Display::Mesh(mesh) => mesh.draw(pass),
        }
    }
}

pub fn create_display(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    config: &RunConfig,
) -> Display {
    match config.sim {
        SimKind::Wave => Display::Quad(QuadDisplay::new(
            device,
            surface_format,
            config.width,
            config.height,
        )),
        SimKind::ShallowWater => Display::Mesh(MeshDisplay::new(
            device,
            surface_format,
            config.width,
            config.height,
        )),
    }
}

// ======================== Quad Path ========================

/// Fullscreen strip sampling an `R32Float` texture. The field bytes go up
/// through `write_texture` each frame; `bytes_per_row` needs no alignment
/// on the queue upload path, so odd grid widths are fine.
pub struct QuadDisplay {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

impl QuadDisplay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = load_shader(device, "quad", include_str!("shaders/quad.wgsl"));

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("field_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad_bgl"),
            entries: &[bgl_texture(0)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad_bg"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture_view),
            }],
        });

        // Two triangles as a strip covering the whole viewport.
        let positions: [f32; 8] = [-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertices"),
            contents: bytemuck::cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad_pipeline_layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quad_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
            vertex_buffer,
            texture,
            width,
            height,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, view: FieldView<'_>) {
        assert_eq!(
            (view.width(), view.height()),
            (self.width, self.height),
            "field view does not match the display texture"
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            view.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..4, 0..1);
    }
}

// ======================== Mesh Path ========================

/// Triangulated grid with one vertex per sample. Positions are static;
/// the field stream is rewritten in place every frame and the uniform
/// selector routes it into one color channel.
pub struct MeshDisplay {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    x_buffer: wgpu::Buffer,
    y_buffer: wgpu::Buffer,
    field_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    params_buffer: wgpu::Buffer,
    bbox: [f32; 4],
    width: u32,
    height: u32,
}

impl MeshDisplay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = load_shader(device, "mesh", include_str!("shaders/mesh.wgsl"));

        let (xs, ys) = grid_positions(width, height);
        let bbox = bbox_transform(&xs, &ys);
        let indices = grid_indices(width, height);
        let index_count = indices.len() as u32;

        let x_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_x"),
            contents: bytemuck::cast_slice(&xs),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let y_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_y"),
            contents: bytemuck::cast_slice(&ys),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let field_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_field"),
            size: u64::from(width) * u64::from(height) * 4,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_params"),
            contents: bytemuck::bytes_of(&MeshParams {
                bbox,
                chosen_field: 0,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh_bgl"),
            entries: &[bgl_uniform(0)],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mesh_bg"),
            layout: &bgl,
            entries: &[bg_buffer(0, &params_buffer)],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[scalar_stream(0), scalar_stream(1), scalar_stream(2)],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
            x_buffer,
            y_buffer,
            field_buffer,
            index_buffer,
            index_count,
            params_buffer,
            bbox,
            width,
            height,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, view: FieldView<'_>) {
        assert_eq!(
            (view.width(), view.height()),
            (self.width, self.height),
            "field view does not match the mesh grid"
        );
        queue.write_buffer(&self.field_buffer, 0, view.as_bytes());
    }

    pub fn set_chosen_field(&self, queue: &wgpu::Queue, index: usize) {
        let params = MeshParams {
            bbox: self.bbox,
            chosen_field: index as u32,
            _pad: [0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.x_buffer.slice(..));
        pass.set_vertex_buffer(1, self.y_buffer.slice(..));
        pass.set_vertex_buffer(2, self.field_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

// ======================== Mesh Geometry ========================

/// Vertex positions of a `width x height` grid over the unit square,
/// row-major to line up with field sample order.
fn grid_positions(width: u32, height: u32) -> (Vec<f32>, Vec<f32>) {
    let count = (width * height) as usize;
    let mut xs = Vec::with_capacity(count);
    let mut ys = Vec::with_capacity(count);
    for j in 0..height {
        let y = j as f32 / (height - 1) as f32;
        for i in 0..width {
            xs.push(i as f32 / (width - 1) as f32);
            ys.push(y);
        }
    }
    (xs, ys)
}

/// Two triangles per grid cell, 16-bit indices. The index width caps the
/// grid at 65536 vertices; the constructor refuses anything larger.
fn grid_indices(width: u32, height: u32) -> Vec<u16> {
    assert!(
        width * height <= 1 << 16,
        "{}x{} grid does not fit 16-bit mesh indices",
        width,
        height
    );
    let mut indices = Vec::with_capacity(((width - 1) * (height - 1) * 6) as usize);
    for j in 0..height - 1 {
        for i in 0..width - 1 {
            let n = (j * width + i) as u16;
            let w = width as u16;
            indices.push(n);
            indices.push(n + 1);
            indices.push(n + w);
            indices.push(n + 1);
            indices.push(n + w);
            indices.push(n + w + 1);
        }
    }
    indices
}

/// Offset/scale pairs mapping data coordinates onto `[0,1]`, computed from
/// the actual vertex extents rather than assumed.
fn bbox_transform(xs: &[f32], ys: &[f32]) -> [f32; 4] {
    let mut x_min = f32::INFINITY;
    let mut x_max = f32::NEG_INFINITY;
    for &x in xs {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
    }
    let mut y_min = f32::INFINITY;
    let mut y_max = f32::NEG_INFINITY;
    for &y in ys {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    [
        x_min,
        1.0 / (x_max - x_min),
        y_min,
        1.0 / (y_max - y_min),
    ]
}

// ======================== Helpers ========================

fn load_shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

static MESH_ATTRS: [[wgpu::VertexAttribute; 1]; 3] = [
    wgpu::vertex_attr_array![0 => Float32],
    wgpu::vertex_attr_array![1 => Float32],
    wgpu::vertex_attr_array![2 => Float32],
];

/// The mesh vertex streams are all tightly packed scalar f32 attributes,
/// one stream per shader location.
fn scalar_stream(location: usize) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 4,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRS[location],
    }
}

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_texture(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn bg_buffer(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}
