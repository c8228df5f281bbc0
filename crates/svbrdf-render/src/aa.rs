use svbrdf_core::AntialiasingMode;

use crate::blit::{mip_view, Blitter};
use crate::texture::GpuTexture;

/// Target sizes for one view under an antialiasing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AaPlan {
    pub mode: AntialiasingMode,
    pub output: (u32, u32),
    /// Size of the surface the scene is rasterized into.
    pub render: (u32, u32),
    pub mip_levels: u32,
    pub sample_count: u32,
}

impl AaPlan {
    pub fn new(mode: AntialiasingMode, width: u32, height: u32) -> Self {
        let output = (width.max(1), height.max(1));
        let factor = mode.supersampling();
        Self {
            mode,
            output,
            render: (output.0 * factor, output.1 * factor),
            mip_levels: mode.mip_levels(),
            sample_count: mode.sample_count(),
        }
    }

    pub fn mip_size(&self, level: u32) -> (u32, u32) {
        ((self.render.0 >> level).max(1), (self.render.1 >> level).max(1))
    }

    /// Size of the last mip, which is what reaches the output.
    pub fn coarsest_size(&self) -> (u32, u32) {
        self.mip_size(self.mip_levels - 1)
    }

    pub fn is_supersampled(&self) -> bool {
        self.mip_levels > 1
    }
}

/// Drop supersampling until every view fits in `max_dimension` texels.
/// Views larger than the limit themselves are left to the surface.
pub fn fit_supersampling(
    mode: AntialiasingMode,
    view_sizes: &[(u32, u32)],
    max_dimension: u32,
) -> AntialiasingMode {
    let largest = view_sizes
        .iter()
        .map(|&(w, h)| w.max(h).max(1))
        .max()
        .unwrap_or(1);
    let mut fitted = mode;
    while fitted.supersampling() > 1
        && largest.saturating_mul(fitted.supersampling()) > max_dimension
    {
        fitted = match fitted {
            AntialiasingMode::Ssaa4x => AntialiasingMode::Ssaa2x,
            _ => AntialiasingMode::None,
        };
    }
    fitted
}

enum ColorTarget {
    /// Draw straight into the output.
    Direct,
    Multisampled(GpuTexture),
    /// Mip-chained offscreen target; `base` views level 0.
    Supersampled {
        texture: GpuTexture,
        base: wgpu::TextureView,
        coarsest: wgpu::TextureView,
    },
}

/// Color and depth targets for one view.
pub struct AaTarget {
    pub plan: AaPlan,
    color: ColorTarget,
    depth: GpuTexture,
}

impl AaTarget {
    pub fn new(device: &wgpu::Device, plan: AaPlan, format: wgpu::TextureFormat) -> Self {
        let (width, height) = plan.render;
        let color = if plan.is_supersampled() {
            let texture = GpuTexture::new(
                device,
                &wgpu::TextureDescriptor {
                    label: Some("ssaa-color"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: plan.mip_levels,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
            );
            let base = mip_view(&texture.texture, 0);
            let coarsest = mip_view(&texture.texture, plan.mip_levels - 1);
            ColorTarget::Supersampled {
                texture,
                base,
                coarsest,
            }
        } else if plan.sample_count > 1 {
            ColorTarget::Multisampled(GpuTexture::new(
                device,
                &wgpu::TextureDescriptor {
                    label: Some("msaa-color"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: plan.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                },
            ))
        } else {
            ColorTarget::Direct
        };
        let depth = GpuTexture::depth(device, "view-depth", width, height, plan.sample_count);
        Self { plan, color, depth }
    }

    /// Begin the scene pass: color cleared to black, depth to 0.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        let (view, resolve_target) = match &self.color {
            ColorTarget::Direct => (output, None),
            ColorTarget::Multisampled(msaa) => (&msaa.view, Some(output)),
            ColorTarget::Supersampled { base, .. } => (base, None),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// Bring the scene to `output`. MSAA resolved inside the pass already.
    pub fn resolve(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        blitter: &Blitter,
        output: &wgpu::TextureView,
    ) {
        if let ColorTarget::Supersampled {
            texture, coarsest, ..
        } = &self.color
        {
            blitter.generate_mips(device, encoder, &texture.texture);
            blitter.blit(device, encoder, coarsest, output);
        }
    }
}

/// One target per view: a single one on a monitor, one per eye in VR.
pub struct AaTargets {
    pub mode: AntialiasingMode,
    views: Vec<AaTarget>,
    blitter: Blitter,
}

impl AaTargets {
    pub fn new(
        device: &wgpu::Device,
        mode: AntialiasingMode,
        format: wgpu::TextureFormat,
        view_sizes: &[(u32, u32)],
    ) -> Self {
        let requested = mode;
        let mode = fit_supersampling(requested, view_sizes, device.limits().max_texture_dimension_2d);
        if mode != requested {
            log::warn!("{requested:?} exceeds the device texture size, using {mode:?}");
        }
        let views = view_sizes
            .iter()
            .map(|&(w, h)| AaTarget::new(device, AaPlan::new(mode, w, h), format))
            .collect::<Vec<_>>();
        if let Some(first) = views.first() {
            log::info!(
                "Antialiasing: {:?}, {} view(s), render size {}x{}",
                mode,
                views.len(),
                first.plan.render.0,
                first.plan.render.1
            );
        }
        Self {
            mode,
            views,
            blitter: Blitter::new(device, format),
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.mode.sample_count()
    }

    pub fn view(&self, index: usize) -> Option<&AaTarget> {
        self.views.get(index)
    }

    pub fn resolve(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        index: usize,
        output: &wgpu::TextureView,
    ) {
        if let Some(target) = self.views.get(index) {
            target.resolve(device, encoder, &self.blitter, output);
        }
    }
}
