use glam::Mat4;
use svbrdf_core::constants::CUBE_FACES;
use svbrdf_core::math::cube_face_view_projs;
use svbrdf_core::{FrameConstants, Light};

use crate::geometry::{vertex_buffer_layout, GpuMesh};
use crate::texture::DEPTH_FORMAT;

/// Per-face uniforms of the depth-only pass. Must match ShadowPass in shadow.wgsl.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowPassUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// x: mesh scale, y: displacement magnitude, z: tessellation flag.
    pub params: [f32; 4],
}

/// Parameters the shadow resources and the depth pipeline are built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    pub resolution: u32,
    pub shadow_lights: u32,
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
}

impl ShadowConfig {
    pub fn from_constants(constants: &FrameConstants, light_count: usize) -> Self {
        Self {
            resolution: constants.shadow_resolution,
            shadow_lights: constants.shadow_lights.min(light_count as u32),
            depth_bias: constants.shadow_depth_bias,
            slope_scaled_depth_bias: constants.shadow_ss_depth_bias,
        }
    }

    /// Largest configuration the device can allocate: whole cubes within
    /// the array layer limit, faces within the 2D dimension limit.
    pub fn fit_limits(self, limits: &wgpu::Limits) -> Self {
        Self {
            resolution: self.resolution.clamp(1, limits.max_texture_dimension_2d.max(1)),
            shadow_lights: self
                .shadow_lights
                .min(limits.max_texture_array_layers / CUBE_FACES),
            ..self
        }
    }
}

/// The depth array must be reallocated.
pub fn needs_realloc(old: &ShadowConfig, new: &ShadowConfig) -> bool {
    old.shadow_lights != new.shadow_lights || old.resolution != new.resolution
}

/// Only the depth pipeline must be rebuilt.
pub fn needs_pipeline(old: &ShadowConfig, new: &ShadowConfig) -> bool {
    old.depth_bias != new.depth_bias || old.slope_scaled_depth_bias != new.slope_scaled_depth_bias
}

/// Depth layers for `shadow_lights` cube maps. Never fewer than one cube so
/// the array can always be bound.
pub fn layer_count(shadow_lights: u32) -> u32 {
    (shadow_lights * CUBE_FACES).max(CUBE_FACES)
}

/// View-projections of every cube face of the first `shadow_lights` lights,
/// padded with identity up to `layer_count`.
pub fn face_view_projs(lights: &[Light], shadow_lights: u32) -> Vec<Mat4> {
    let mut faces: Vec<Mat4> = lights
        .iter()
        .take(shadow_lights as usize)
        .flat_map(|l| cube_face_view_projs(l.position))
        .collect();
    faces.resize(layer_count(shadow_lights) as usize, Mat4::IDENTITY);
    faces
}

fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

fn create_pipeline(
    device: &wgpu::Device,
    pass_bgl: &wgpu::BindGroupLayout,
    material_bgl: &wgpu::BindGroupLayout,
    config: &ShadowConfig,
) -> wgpu::RenderPipeline {
    let source = format!(
        "{}\n{}",
        include_str!("../../../shaders/render/displace.wgsl"),
        include_str!("../../../shaders/render/shadow.wgsl"),
    );
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shadow-shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("shadow-pipeline-layout"),
        bind_group_layouts: &[pass_bgl, material_bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shadow-pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_shadow"),
            buffers: &[vertex_buffer_layout()],
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
            bias: wgpu::DepthBiasState {
                constant: config.depth_bias,
                slope_scale: config.slope_scaled_depth_bias,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: None,
        multiview: None,
        cache: None,
    })
}

/// Cube shadow maps stored as one depth texture array, six layers per light.
pub struct ShadowMaps {
    pub config: ShadowConfig,
    layer_views: Vec<wgpu::TextureView>,
    /// All layers, bound for lookups in the lighting shaders.
    pub array_view: wgpu::TextureView,
    /// `GreaterEqual` comparison sampler for inverse-Z lookups.
    pub sampler: wgpu::Sampler,
    /// Face view-projections, read by the lighting shaders.
    pub face_buffer: wgpu::Buffer,
    pass_buffer: wgpu::Buffer,
    pass_bgl: wgpu::BindGroupLayout,
    pass_bind_group: wgpu::BindGroup,
    pass_stride: u64,
    pipeline: wgpu::RenderPipeline,
}

impl ShadowMaps {
    pub fn new(
        device: &wgpu::Device,
        material_bgl: &wgpu::BindGroupLayout,
        config: ShadowConfig,
    ) -> Self {
        let layers = layer_count(config.shadow_lights);
        let resolution = config.resolution.max(1);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow-maps"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("shadow-face-view"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow-array-view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::GreaterEqual),
            ..Default::default()
        });

        let face_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow-face-view-projs"),
            size: layers as u64 * std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_size = std::mem::size_of::<ShadowPassUniforms>() as u64;
        let pass_stride = align_to(
            uniform_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let pass_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow-pass-uniforms"),
            size: pass_stride * layers as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pass_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-pass-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let pass_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-pass-bg"),
            layout: &pass_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &pass_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
        });

        let pipeline = create_pipeline(device, &pass_bgl, material_bgl, &config);

        log::info!(
            "Shadow maps: {} lights, {}x{} per face",
            config.shadow_lights,
            resolution,
            resolution
        );

        Self {
            config,
            layer_views,
            array_view,
            sampler,
            face_buffer,
            pass_buffer,
            pass_bgl,
            pass_bind_group,
            pass_stride,
            pipeline,
        }
    }

    /// Swap in a pipeline with new depth biases, keeping the depth array.
    pub fn rebuild_pipeline(
        &mut self,
        device: &wgpu::Device,
        material_bgl: &wgpu::BindGroupLayout,
        config: ShadowConfig,
    ) {
        self.pipeline = create_pipeline(device, &self.pass_bgl, material_bgl, &config);
        self.config = config;
        log::debug!(
            "Shadow depth bias {} (slope {})",
            config.depth_bias,
            config.slope_scaled_depth_bias
        );
    }

    /// Rewrite face matrices from the current light positions.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        lights: &[Light],
        mesh_scale: f32,
        magnitude: f32,
        tessellation: bool,
    ) {
        let faces = face_view_projs(lights, self.config.shadow_lights);
        let matrices: Vec<[[f32; 4]; 4]> = faces.iter().map(|m| m.to_cols_array_2d()).collect();
        queue.write_buffer(&self.face_buffer, 0, bytemuck::cast_slice(&matrices));

        let params = [mesh_scale, magnitude, if tessellation { 1.0 } else { 0.0 }, 0.0];
        for (i, view_proj) in matrices.iter().enumerate() {
            let uniforms = ShadowPassUniforms {
                view_proj: *view_proj,
                params,
            };
            queue.write_buffer(
                &self.pass_buffer,
                i as u64 * self.pass_stride,
                bytemuck::bytes_of(&uniforms),
            );
        }
    }

    /// One depth-only pass per cube face of every shadow-casting light.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mesh: &GpuMesh,
        material_bind_group: &wgpu::BindGroup,
    ) {
        let faces = (self.config.shadow_lights * CUBE_FACES) as usize;
        for (i, view) in self.layer_views.iter().take(faces).enumerate() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.pass_bind_group, &[(i as u64 * self.pass_stride) as u32]);
            pass.set_bind_group(1, material_bind_group, &[]);
            mesh.draw(&mut pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};
    use svbrdf_core::{compute_constants, RenderModes, RenderingState, ShadowMode, ViewSnapshot};

    #[test]
    fn test_shadow_pass_uniform_size() {
        assert_eq!(std::mem::size_of::<ShadowPassUniforms>(), 80);
    }

    #[test]
    fn test_layer_count_has_one_cube_minimum() {
        assert_eq!(layer_count(0), 6);
        assert_eq!(layer_count(1), 6);
        assert_eq!(layer_count(3), 18);
    }

    #[test]
    fn test_face_view_projs_padded_and_ordered() {
        let lights = vec![
            Light {
                position: Vec3::new(1.0, 2.0, 3.0),
                ..Default::default()
            },
            Light::default(),
        ];
        let faces = face_view_projs(&lights, 0);
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|m| *m == Mat4::IDENTITY));

        let faces = face_view_projs(&lights, 2);
        assert_eq!(faces.len(), 12);
        // +X face of the first light sees a point one unit along +X at the center.
        let clip = faces[0] * Vec4::new(2.0, 2.0, 3.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z <= 1.0);
    }

    fn config() -> ShadowConfig {
        ShadowConfig {
            resolution: 1024,
            shadow_lights: 2,
            depth_bias: 4,
            slope_scaled_depth_bias: 2.0,
        }
    }

    #[test]
    fn test_count_or_resolution_change_reallocates() {
        let old = config();
        let more = ShadowConfig {
            shadow_lights: 3,
            ..old
        };
        let sharper = ShadowConfig {
            resolution: 2048,
            ..old
        };
        assert!(needs_realloc(&old, &more));
        assert!(needs_realloc(&old, &sharper));
        assert!(!needs_pipeline(&old, &more));
        assert!(!needs_pipeline(&old, &sharper));
    }

    #[test]
    fn test_bias_change_rebuilds_pipeline_only() {
        let old = config();
        let constant = ShadowConfig {
            depth_bias: 8,
            ..old
        };
        let slope = ShadowConfig {
            slope_scaled_depth_bias: 0.5,
            ..old
        };
        assert!(!needs_realloc(&old, &constant));
        assert!(!needs_realloc(&old, &slope));
        assert!(needs_pipeline(&old, &constant));
        assert!(needs_pipeline(&old, &slope));
    }

    #[test]
    fn test_moving_a_light_keeps_shadow_resources() {
        let mut state = RenderingState {
            shadow_lights: 1,
            ..Default::default()
        };
        let modes = RenderModes {
            shadows: ShadowMode::ShadowMapping,
            ..Default::default()
        };
        let before = ShadowConfig::from_constants(
            &compute_constants(&state, &modes, ViewSnapshot::default()),
            state.lights.len(),
        );
        state.lights[0].position += Vec3::new(1.0, -2.0, 0.5);
        let after = ShadowConfig::from_constants(
            &compute_constants(&state, &modes, ViewSnapshot::default()),
            state.lights.len(),
        );
        assert_eq!(before.shadow_lights, 1);
        assert!(!needs_realloc(&before, &after));
        assert!(!needs_pipeline(&before, &after));
    }

    #[test]
    fn test_from_constants_caps_shadow_lights_at_light_count() {
        let state = RenderingState {
            shadow_lights: 1,
            ..Default::default()
        };
        let modes = RenderModes {
            shadows: ShadowMode::ShadowMapping,
            ..Default::default()
        };
        let constants = compute_constants(&state, &modes, ViewSnapshot::default());
        assert_eq!(ShadowConfig::from_constants(&constants, 0).shadow_lights, 0);
        assert_eq!(ShadowConfig::from_constants(&constants, 4).shadow_lights, 1);
    }

    #[test]
    fn test_fit_limits_clamps_layers_and_resolution() {
        let limits = wgpu::Limits {
            max_texture_array_layers: 2048,
            max_texture_dimension_2d: 8192,
            ..wgpu::Limits::default()
        };
        let requested = ShadowConfig {
            resolution: 16384,
            shadow_lights: 400,
            ..config()
        };
        let fitted = requested.fit_limits(&limits);
        assert_eq!(fitted.shadow_lights, 341);
        assert!(layer_count(fitted.shadow_lights) <= 2048);
        assert_eq!(fitted.resolution, 8192);
        assert_eq!(fitted.depth_bias, requested.depth_bias);

        assert_eq!(config().fit_limits(&limits), config());
    }

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
