use svbrdf_core::math::full_mip_count;
use svbrdf_core::{FrameConstants, Light, LightingMode, LightingPrecision, MeshData};

use crate::blit::{mip_view, Blitter};
use crate::geometry::{vertex_buffer_layout, GpuMesh};
use crate::lights::LightBuffer;
use crate::shadow::{needs_pipeline, needs_realloc, ShadowConfig, ShadowMaps};
use crate::texture::{GpuTexture, MaterialTextures, DEPTH_FORMAT};

/// Views rendered per frame: one on a monitor, one per eye in VR.
pub const MAX_VIEWS: u32 = 2;

/// Sample count of the multisampled pipeline variant.
pub const MSAA_SAMPLES: u32 = 4;

/// Per-view uniforms. Must match Frame in material.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// w holds the max luminance used by modified Reinhard.
    pub ambient: [f32; 4],
    pub light_count: u32,
    pub shadow_lights: u32,
    pub pcf_taps: u32,
    pub tonemap_mode: u32,
    pub normal_mode: u32,
    pub use_normal_mapping: u32,
    pub tessellation: u32,
    pub alpha: f32,
    pub displacement_magnitude: f32,
    pub kernel_width: f32,
    pub shadow_resolution: f32,
    pub mesh_scale: f32,
}

impl FrameUniforms {
    pub fn new(constants: &FrameConstants, light_count: u32, alpha: f32, mesh_scale: f32) -> Self {
        Self {
            view_proj: constants.view.view_proj.to_cols_array_2d(),
            camera_position: constants.view.camera_position.extend(1.0).to_array(),
            ambient: constants.ambient.extend(constants.max_luminance).to_array(),
            light_count,
            shadow_lights: constants.shadow_lights.min(light_count),
            pcf_taps: constants.shadow_pcf_taps.max(1),
            tonemap_mode: constants.tonemap.gpu_index(),
            normal_mode: constants.normal_mode.gpu_index(),
            use_normal_mapping: constants.use_normal_mapping as u32,
            tessellation: constants.tessellation as u32,
            alpha,
            displacement_magnitude: constants.displacement_magnitude,
            kernel_width: constants.shadow_kernel_width,
            shadow_resolution: constants.shadow_resolution as f32,
            mesh_scale,
        }
    }
}

/// Lightmap storage for a precision, downgraded when the adapter cannot
/// render or filter it.
pub fn lightmap_format(precision: LightingPrecision, features: wgpu::Features) -> wgpu::TextureFormat {
    match precision {
        LightingPrecision::Float11_11_10
            if features.contains(wgpu::Features::RG11B10UFLOAT_RENDERABLE) =>
        {
            wgpu::TextureFormat::Rg11b10Ufloat
        }
        LightingPrecision::Float32 if features.contains(wgpu::Features::FLOAT32_FILTERABLE) => {
            wgpu::TextureFormat::Rgba32Float
        }
        LightingPrecision::Float16 => wgpu::TextureFormat::Rgba16Float,
        other => {
            log::warn!("{other:?} lightmaps unsupported on this adapter, using 16-bit floats");
            wgpu::TextureFormat::Rgba16Float
        }
    }
}

/// Shadow maps for `requested`, shrunk to what the device can allocate.
fn allocate_shadows(
    device: &wgpu::Device,
    material_bgl: &wgpu::BindGroupLayout,
    requested: ShadowConfig,
) -> ShadowMaps {
    let config = requested.fit_limits(&device.limits());
    if config != requested {
        log::warn!(
            "Shadow maps limited by the device: {} of {} lights, {}px of {}px",
            config.shadow_lights,
            requested.shadow_lights,
            config.resolution,
            requested.resolution
        );
    }
    ShadowMaps::new(device, material_bgl, config)
}

fn pipeline_slot(sample_count: u32) -> usize {
    usize::from(sample_count > 1)
}

/// Everything a renderer instance is built from.
pub struct RendererDesc<'a> {
    pub mesh: &'a MeshData,
    pub mesh_scale: f32,
    pub material: &'a MaterialTextures,
    pub lighting: LightingMode,
    pub precision: LightingPrecision,
    pub output_format: wgpu::TextureFormat,
    pub shadow: ShadowConfig,
    pub anisotropy: u16,
}

struct MeshPipelines {
    fill: wgpu::RenderPipeline,
    wireframe: Option<wgpu::RenderPipeline>,
}

struct TextureSpace {
    lightmap: GpuTexture,
    target_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    blitter: Blitter,
    bind_group: wgpu::BindGroup,
}

/// Draws one material on one mesh with one lighting strategy. Rebuilt, not
/// mutated, when any of those change.
pub struct MaterialRenderer {
    mesh: GpuMesh,
    alpha: f32,
    frame_bgl: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_stride: u64,
    frame_bind_group: wgpu::BindGroup,
    material_bgl: wgpu::BindGroupLayout,
    material_bind_group: wgpu::BindGroup,
    lights: LightBuffer,
    shadows: ShadowMaps,
    pipelines: [MeshPipelines; 2],
    texture_space: Option<TextureSpace>,
}

impl MaterialRenderer {
    pub fn new(device: &wgpu::Device, desc: &RendererDesc) -> Self {
        let source = format!(
            "{}\n{}",
            include_str!("../../../shaders/render/displace.wgsl"),
            include_str!("../../../shaders/render/material.wgsl"),
        );
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("material-shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // -- Frame group: per-view uniforms, lights, shadows --
        let frame_size = std::mem::size_of::<FrameUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let frame_stride = frame_size.div_ceil(alignment) * alignment;
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniforms"),
            size: frame_stride * MAX_VIEWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let fragment_storage = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(frame_size),
                    },
                    count: None,
                },
                fragment_storage(1),
                fragment_storage(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        // -- Material group: SVBRDF maps and height field --
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let material_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: desc.anisotropy.clamp(1, 16),
            ..Default::default()
        });

        let maps = desc.material;
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material-bg"),
            layout: &material_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&maps.diffuse_albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&maps.specular_albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&maps.specular_shape.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&maps.normals.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&maps.height.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let lights = LightBuffer::new(device);
        let shadows = allocate_shadows(device, &material_bgl, desc.shadow);
        let frame_bind_group =
            Self::create_frame_bind_group(device, &frame_bgl, &frame_buffer, &lights, &shadows);

        // -- Texture-space lightmap --
        let lightmap_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lightmap-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let base_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("material-pipeline-layout"),
            bind_group_layouts: &[&frame_bgl, &material_bgl],
            push_constant_ranges: &[],
        });

        let texture_space = (desc.lighting == LightingMode::TextureSpace).then(|| {
            let format = lightmap_format(desc.precision, device.features());
            let (width, height) = maps.size;
            let lightmap = GpuTexture::new(
                device,
                &wgpu::TextureDescriptor {
                    label: Some("texture-space-lightmap"),
                    size: wgpu::Extent3d {
                        width: width.max(1),
                        height: height.max(1),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: full_mip_count(width.max(1), height.max(1)),
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
            );
            let target_view = mip_view(&lightmap.texture, 0);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lightmap-bg"),
                layout: &lightmap_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&lightmap.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("texture-space-lighting-pipeline"),
                layout: Some(&base_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_uv"),
                    buffers: &[vertex_buffer_layout()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_lightmap"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            });
            log::info!(
                "Texture space lighting: {}x{} {:?} lightmap, {} mips",
                width,
                height,
                format,
                lightmap.texture.mip_level_count()
            );
            TextureSpace {
                lightmap,
                target_view,
                pipeline,
                blitter: Blitter::new(device, format),
                bind_group,
            }
        });

        // -- Mesh pipelines, single-sampled and multisampled --
        let lightmap_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lightmap-sample-pipeline-layout"),
            bind_group_layouts: &[&frame_bgl, &material_bgl, &lightmap_bgl],
            push_constant_ranges: &[],
        });
        let (layout, fill_entry) = match desc.lighting {
            LightingMode::Forward => (&base_layout, "fs_forward"),
            LightingMode::TextureSpace => (&lightmap_layout, "fs_sample_lightmap"),
        };
        let wireframe_supported = device.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let build = |samples: u32| MeshPipelines {
            fill: Self::create_mesh_pipeline(
                device,
                layout,
                &module,
                fill_entry,
                desc.output_format,
                samples,
                false,
            ),
            wireframe: wireframe_supported.then(|| {
                Self::create_mesh_pipeline(
                    device,
                    layout,
                    &module,
                    "fs_wireframe",
                    desc.output_format,
                    samples,
                    true,
                )
            }),
        };
        let pipelines = [build(1), build(MSAA_SAMPLES)];

        log::info!(
            "Renderer: {:?} lighting, {} triangles",
            desc.lighting,
            desc.mesh.triangle_count()
        );

        Self {
            mesh: GpuMesh::new(device, desc.mesh, desc.mesh_scale),
            alpha: maps.alpha,
            frame_bgl,
            frame_buffer,
            frame_stride,
            frame_bind_group,
            material_bgl,
            material_bind_group,
            lights,
            shadows,
            pipelines,
            texture_space,
        }
    }

    pub fn update_lights(&mut self, queue: &wgpu::Queue, lights: &[Light]) {
        self.lights.upload(queue, lights);
    }

    /// Work shared by every view of a frame: the shadow maps.
    pub fn render_viewport_independent(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        constants: &FrameConstants,
        lights: &[Light],
    ) {
        let requested = ShadowConfig::from_constants(constants, lights.len());
        let config = requested.fit_limits(&device.limits());
        if needs_realloc(&self.shadows.config, &config) {
            self.shadows = allocate_shadows(device, &self.material_bgl, requested);
            self.frame_bind_group = Self::create_frame_bind_group(
                device,
                &self.frame_bgl,
                &self.frame_buffer,
                &self.lights,
                &self.shadows,
            );
        } else if needs_pipeline(&self.shadows.config, &config) {
            self.shadows
                .rebuild_pipeline(device, &self.material_bgl, config);
        }

        if config.shadow_lights == 0 {
            return;
        }
        self.shadows.update(
            queue,
            lights,
            self.mesh.scale,
            constants.displacement_magnitude,
            constants.tessellation,
        );
        self.shadows
            .render(encoder, &self.mesh, &self.material_bind_group);
    }

    /// Upload this view's uniforms and, for texture-space lighting, relight
    /// the lightmap and rebuild its mips.
    pub fn prepare_view(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view_index: u32,
        constants: &FrameConstants,
    ) {
        let mut uniforms =
            FrameUniforms::new(constants, self.lights.count(), self.alpha, self.mesh.scale);
        uniforms.shadow_lights = uniforms.shadow_lights.min(self.shadows.config.shadow_lights);
        uniforms.shadow_resolution = self.shadows.config.resolution as f32;
        let offset = self.view_offset(view_index);
        queue.write_buffer(&self.frame_buffer, offset as u64, bytemuck::bytes_of(&uniforms));

        let Some(ts) = &self.texture_space else {
            return;
        };

        // 1. Light every texel of the lightmap
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("texture-space-lighting-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &ts.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&ts.pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[offset]);
            pass.set_bind_group(1, &self.material_bind_group, &[]);
            self.mesh.draw(&mut pass);
        }

        // 2. Mip chain for anisotropic sampling
        ts.blitter
            .generate_mips(device, encoder, &ts.lightmap.texture);
    }

    /// Draw the mesh into a pass prepared by the caller.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        view_index: u32,
        sample_count: u32,
        wireframe: bool,
    ) {
        let pipelines = &self.pipelines[pipeline_slot(sample_count)];
        let offset = self.view_offset(view_index);

        pass.set_pipeline(&pipelines.fill);
        pass.set_bind_group(0, &self.frame_bind_group, &[offset]);
        pass.set_bind_group(1, &self.material_bind_group, &[]);
        if let Some(ts) = &self.texture_space {
            pass.set_bind_group(2, &ts.bind_group, &[]);
        }
        self.mesh.draw(pass);

        if wireframe {
            if let Some(lines) = &pipelines.wireframe {
                pass.set_pipeline(lines);
                self.mesh.draw(pass);
            }
        }
    }

    fn view_offset(&self, view_index: u32) -> u32 {
        (view_index.min(MAX_VIEWS - 1) as u64 * self.frame_stride) as u32
    }

    // -- Private helpers --

    fn create_frame_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        frame_buffer: &wgpu::Buffer,
        lights: &LightBuffer,
        shadows: &ShadowMaps,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: frame_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniforms>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: shadows.face_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&shadows.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&shadows.sampler),
                },
            ],
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_mesh_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        module: &wgpu::ShaderModule,
        fragment_entry: &str,
        format: wgpu::TextureFormat,
        samples: u32,
        wireframe: bool,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(if wireframe {
                "mesh-wireframe-pipeline"
            } else {
                "mesh-pipeline"
            }),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[vertex_buffer_layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                polygon_mode: if wireframe {
                    wgpu::PolygonMode::Line
                } else {
                    wgpu::PolygonMode::Fill
                },
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: !wireframe,
                depth_compare: if wireframe {
                    wgpu::CompareFunction::GreaterEqual
                } else {
                    wgpu::CompareFunction::Greater
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: samples,
                ..Default::default()
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(fragment_entry),
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use svbrdf_core::{compute_constants, NormalMode, RenderModes, RenderingState, TonemapMode, ViewSnapshot};

    #[test]
    fn test_frame_uniforms_size() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 144);
    }

    #[test]
    fn test_frame_uniforms_from_constants() {
        let state = RenderingState {
            tonemap_mode: TonemapMode::ReinhardModified,
            ..Default::default()
        };
        let modes = RenderModes {
            normals: NormalMode::Reconstructed,
            ..Default::default()
        };
        let view = ViewSnapshot {
            view_proj: Mat4::IDENTITY,
            camera_position: Vec3::new(1.0, 2.0, 3.0),
        };
        let constants = compute_constants(&state, &modes, view);
        let u = FrameUniforms::new(&constants, 3, 1.5, 0.5);
        assert_eq!(u.tonemap_mode, 2);
        assert_eq!(u.normal_mode, 1);
        assert_eq!(u.light_count, 3);
        assert_eq!(u.shadow_lights, 0);
        assert_eq!(u.camera_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.ambient[3], constants.max_luminance);
        assert_eq!(u.alpha, 1.5);
        assert_eq!(u.mesh_scale, 0.5);
    }

    #[test]
    fn test_lightmap_format_fallbacks() {
        let none = wgpu::Features::empty();
        let all = wgpu::Features::RG11B10UFLOAT_RENDERABLE | wgpu::Features::FLOAT32_FILTERABLE;
        assert_eq!(
            lightmap_format(LightingPrecision::Float11_11_10, all),
            wgpu::TextureFormat::Rg11b10Ufloat
        );
        assert_eq!(
            lightmap_format(LightingPrecision::Float11_11_10, none),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            lightmap_format(LightingPrecision::Float32, all),
            wgpu::TextureFormat::Rgba32Float
        );
        assert_eq!(
            lightmap_format(LightingPrecision::Float32, none),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            lightmap_format(LightingPrecision::Float16, none),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn test_pipeline_slot() {
        assert_eq!(pipeline_slot(1), 0);
        assert_eq!(pipeline_slot(MSAA_SAMPLES), 1);
    }
}
