use bytemuck::Zeroable;
use svbrdf_core::constants::MAX_LIGHTS;
use svbrdf_core::Light;

/// GPU point light (32 bytes, matches WGSL GpuLight).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub falloff: f32,
    pub color: [f32; 3],
    pub _padding: f32,
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.to_array(),
            falloff: light.falloff,
            color: light.color.to_array(),
            _padding: 0.0,
        }
    }
}

/// Pre-allocated storage buffer for up to `MAX_LIGHTS` lights.
pub struct LightBuffer {
    pub buffer: wgpu::Buffer,
    count: u32,
}

impl LightBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-array"),
            size: MAX_LIGHTS as u64 * std::mem::size_of::<GpuLight>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, count: 0 }
    }

    /// Rewrite the light array. Lights past `MAX_LIGHTS` are dropped.
    pub fn upload(&mut self, queue: &wgpu::Queue, lights: &[Light]) {
        let gpu = pack_lights(lights);
        self.count = gpu.len() as u32;
        if gpu.is_empty() {
            // Keep the first slot defined for shaders that read it unguarded.
            queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&GpuLight::zeroed()));
        } else {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&gpu));
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

fn pack_lights(lights: &[Light]) -> Vec<GpuLight> {
    if lights.len() > MAX_LIGHTS as usize {
        log::warn!("{} lights exceed the maximum of {MAX_LIGHTS}", lights.len());
    }
    lights
        .iter()
        .take(MAX_LIGHTS as usize)
        .map(GpuLight::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_gpu_light_size() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 32);
    }

    #[test]
    fn test_gpu_light_from_light() {
        let light = Light {
            position: Vec3::new(1.0, 2.0, 3.0),
            falloff: 0.5,
            color: Vec3::new(4.0, 5.0, 6.0),
        };
        let gpu = GpuLight::from(&light);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.falloff, 0.5);
        assert_eq!(gpu.color, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_pack_lights_truncates() {
        let lights = vec![Light::default(); MAX_LIGHTS as usize + 3];
        assert_eq!(pack_lights(&lights).len(), MAX_LIGHTS as usize);
    }
}
