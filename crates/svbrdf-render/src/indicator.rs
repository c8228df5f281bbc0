use glam::{Mat4, Quat, Vec3};
use svbrdf_core::constants::MAX_LIGHTS;
use svbrdf_core::Light;

use crate::material::{MAX_VIEWS, MSAA_SAMPLES};
use crate::texture::DEPTH_FORMAT;

/// Half-size of the selected light's marker.
pub const SELECTED_SIZE: f32 = 0.15;
/// Half-size of every other marker.
pub const UNSELECTED_SIZE: f32 = 0.05;

const VERTICES_PER_INDICATOR: u32 = 12;

/// One marker (32 bytes, matches WGSL Indicator).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuIndicator {
    /// xyz: light position, w: half-size.
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// Billboard basis for one view (96 bytes, matches WGSL IndicatorView).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndicatorViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
}

impl IndicatorViewUniforms {
    /// `rotation` is the camera orientation; markers face along it.
    pub fn new(view_proj: Mat4, rotation: Quat) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            right: (rotation * Vec3::X).extend(0.0).to_array(),
            up: (rotation * Vec3::Y).extend(0.0).to_array(),
        }
    }
}

pub fn indicator_instances(lights: &[Light], selected: usize) -> Vec<GpuIndicator> {
    lights
        .iter()
        .take(MAX_LIGHTS as usize)
        .enumerate()
        .map(|(i, light)| {
            let size = if i == selected {
                SELECTED_SIZE
            } else {
                UNSELECTED_SIZE
            };
            GpuIndicator {
                position: light.position.extend(size).to_array(),
                color: light.color.extend(1.0).to_array(),
            }
        })
        .collect()
}

/// Draws a small camera-facing marker at every light.
pub struct LightIndicator {
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    view_buffer: wgpu::Buffer,
    view_stride: u64,
    bind_group: wgpu::BindGroup,
    pipelines: [wgpu::RenderPipeline; 2],
}

impl LightIndicator {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("light-indicator-shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../shaders/render/light_indicator.wgsl").into(),
            ),
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-indicators"),
            size: MAX_LIGHTS as u64 * std::mem::size_of::<GpuIndicator>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_size = std::mem::size_of::<IndicatorViewUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let view_stride = uniform_size.div_ceil(alignment) * alignment;
        let view_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-indicator-views"),
            size: view_stride * MAX_VIEWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light-indicator-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(uniform_size),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light-indicator-bg"),
            layout: &bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &view_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(uniform_size),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("light-indicator-pipeline-layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let pipeline = |samples: u32| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("light-indicator-pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Greater,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: samples,
                    ..Default::default()
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
        };

        Self {
            instance_buffer,
            instance_count: 0,
            view_buffer,
            view_stride,
            bind_group,
            pipelines: [pipeline(1), pipeline(MSAA_SAMPLES)],
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, lights: &[Light], selected: usize) {
        let instances = indicator_instances(lights, selected);
        self.instance_count = instances.len() as u32;
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
    }

    pub fn prepare_view(&self, queue: &wgpu::Queue, view_index: u32, view_proj: Mat4, rotation: Quat) {
        let uniforms = IndicatorViewUniforms::new(view_proj, rotation);
        queue.write_buffer(
            &self.view_buffer,
            self.view_offset(view_index) as u64,
            bytemuck::bytes_of(&uniforms),
        );
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, view_index: u32, sample_count: u32) {
        if self.instance_count == 0 {
            return;
        }
        let slot = usize::from(sample_count > 1);
        pass.set_pipeline(&self.pipelines[slot]);
        pass.set_bind_group(0, &self.bind_group, &[self.view_offset(view_index)]);
        pass.draw(0..VERTICES_PER_INDICATOR, 0..self.instance_count);
    }

    fn view_offset(&self, view_index: u32) -> u32 {
        (view_index.min(MAX_VIEWS - 1) as u64 * self.view_stride) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<GpuIndicator>(), 32);
        assert_eq!(std::mem::size_of::<IndicatorViewUniforms>(), 96);
    }

    #[test]
    fn test_selected_light_is_larger() {
        let lights = vec![
            Light::default(),
            Light {
                position: Vec3::new(1.0, 2.0, 3.0),
                color: Vec3::new(0.5, 0.25, 1.0),
                ..Default::default()
            },
        ];
        let instances = indicator_instances(&lights, 1);
        assert_eq!(instances.len(), 2);
        assert!((instances[0].position[3] - UNSELECTED_SIZE).abs() < 1e-6);
        assert!((instances[1].position[3] - SELECTED_SIZE).abs() < 1e-6);
        assert_eq!(instances[1].position[..3], [1.0, 2.0, 3.0]);
        assert_eq!(instances[1].color, [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_billboard_axes_follow_camera() {
        let u = IndicatorViewUniforms::new(Mat4::IDENTITY, Quat::IDENTITY);
        assert_eq!(u.right, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(u.up, [0.0, 1.0, 0.0, 0.0]);

        let turned = IndicatorViewUniforms::new(
            Mat4::IDENTITY,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        assert!((turned.right[1] - 1.0).abs() < 1e-6);
        assert!((turned.up[0] + 1.0).abs() < 1e-6);
    }
}
