use wgpu::{
    Adapter, Device, DeviceDescriptor, Features, Instance, InstanceDescriptor, InstanceFlags,
    PowerPreference, Queue, RequestAdapterOptions, Surface, SurfaceConfiguration, TextureFormat,
    TextureUsages,
};

use crate::error::RenderError;

/// Features used when the adapter offers them. Each has a fallback.
pub const OPTIONAL_FEATURES: Features = Features::RG11B10UFLOAT_RENDERABLE
    .union(Features::FLOAT32_FILTERABLE)
    .union(Features::POLYGON_MODE_LINE);

/// Holds the device, queue and window surface created at startup.
pub struct GpuContext {
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub surface_format: TextureFormat,
    pub adapter_name: String,
    pub backend: String,
}

impl GpuContext {
    pub fn features(&self) -> Features {
        self.device.features()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigure the surface for a new window size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.surface_config.present_mode = present_mode(vsync);
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

/// Create the device and configure a surface for `target`.
///
/// Blocks on adapter and device requests.
pub fn init_gpu(
    target: impl Into<wgpu::SurfaceTarget<'static>>,
    width: u32,
    height: u32,
    vsync: bool,
) -> Result<GpuContext, RenderError> {
    let instance = Instance::new(&InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: InstanceFlags::default(),
        ..Default::default()
    });

    let surface = instance
        .create_surface(target)
        .map_err(|e| RenderError::SurfaceConfigFailed(format!("{e}")))?;

    let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
        power_preference: PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| RenderError::AdapterNotFound("No compatible GPU adapter found".into()))?;

    let adapter_info = adapter.get_info();
    let adapter_name = adapter_info.name.clone();
    let backend = format!("{:?}", adapter_info.backend);
    log::info!("Adapter: {} ({})", adapter_name, backend);

    let available = adapter.features() & OPTIONAL_FEATURES;
    for (feature, fallback) in [
        (Features::RG11B10UFLOAT_RENDERABLE, "11-11-10 lightmaps use 16-bit floats"),
        (Features::FLOAT32_FILTERABLE, "32-bit lightmaps use 16-bit floats"),
        (Features::POLYGON_MODE_LINE, "wireframe overlay disabled"),
    ] {
        if !available.contains(feature) {
            log::warn!("Adapter lacks {feature:?}: {fallback}");
        }
    }

    let (device, queue) = pollster::block_on(adapter.request_device(
        &DeviceDescriptor {
            label: Some("svbrdf-device"),
            required_features: available,
            required_limits: adapter.limits(),
            ..Default::default()
        },
        None,
    ))
    .map_err(|e| RenderError::DeviceRequestFailed(format!("{e}")))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| RenderError::SurfaceConfigFailed("Surface reports no formats".into()))?;

    let surface_config = SurfaceConfiguration {
        usage: TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: width.max(1),
        height: height.max(1),
        present_mode: present_mode(vsync),
        desired_maximum_frame_latency: 2,
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
    };
    surface.configure(&device, &surface_config);

    log::info!(
        "Surface format: {:?}, size: {}x{}",
        surface_format,
        surface_config.width,
        surface_config.height
    );

    Ok(GpuContext {
        adapter,
        device,
        queue,
        surface,
        surface_config,
        surface_format,
        adapter_name,
        backend,
    })
}
