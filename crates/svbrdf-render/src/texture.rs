use half::f16;
use svbrdf_core::math::full_mip_count;
use svbrdf_core::{FloatImage, Material};

use crate::blit::Blitter;

/// A texture and its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn new(device: &wgpu::Device, desc: &wgpu::TextureDescriptor) -> Self {
        let texture = device.create_texture(desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Depth target for inverse-Z rendering.
    pub fn depth(device: &wgpu::Device, label: &str, width: u32, height: u32, samples: u32) -> Self {
        Self::new(
            device,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            },
        )
    }
}

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Upload format for a float image: 16-bit floats keep the data filterable.
pub fn image_format(image: &FloatImage) -> wgpu::TextureFormat {
    if image.channels == 1 {
        wgpu::TextureFormat::R16Float
    } else {
        wgpu::TextureFormat::Rgba16Float
    }
}

fn to_half(image: &FloatImage) -> Vec<f16> {
    image.pixels.iter().copied().map(f16::from_f32).collect()
}

/// Upload `image` with a full mip chain. Only levels above 0 are rendered.
pub fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    blitter: &Blitter,
    label: &str,
    image: &FloatImage,
) -> GpuTexture {
    let format = image_format(image);
    debug_assert_eq!(format, blitter.format());
    let size = wgpu::Extent3d {
        width: image.width.max(1),
        height: image.height.max(1),
        depth_or_array_layers: 1,
    };
    let tex = GpuTexture::new(
        device,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: full_mip_count(size.width, size.height),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        },
    );

    if !image.is_empty() {
        let texels = to_half(image);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * image.channels * 2),
                rows_per_image: Some(image.height),
            },
            size,
        );
        blitter.generate_mips(device, encoder, &tex.texture);
    }
    tex
}

/// The material maps resident on the GPU.
pub struct MaterialTextures {
    pub diffuse_albedo: GpuTexture,
    pub specular_albedo: GpuTexture,
    pub specular_shape: GpuTexture,
    pub normals: GpuTexture,
    /// A 1x1 zero texture when the material has no height field.
    pub height: GpuTexture,
    pub alpha: f32,
    pub size: (u32, u32),
}

impl MaterialTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, material: &Material) -> Self {
        let color_blitter = Blitter::new(device, wgpu::TextureFormat::Rgba16Float);
        let height_blitter = Blitter::new(device, wgpu::TextureFormat::R16Float);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("material-upload-encoder"),
        });

        let mut color = |label: &str, image: &FloatImage| {
            upload_image(device, queue, &mut encoder, &color_blitter, label, &as_rgba(image))
        };
        let diffuse_albedo = color("diffuse-albedo", &material.diffuse_albedo);
        let specular_albedo = color("specular-albedo", &material.specular_albedo);
        let specular_shape = color("specular-shape", &material.specular_shape);
        let normals = color("normal-map", &material.normals);

        let flat = FloatImage::new(1, 1, 1);
        let height_image = material
            .height_map
            .as_ref()
            .filter(|h| !h.is_empty())
            .map(as_single_channel)
            .unwrap_or(flat);
        let height = upload_image(
            device,
            queue,
            &mut encoder,
            &height_blitter,
            "height-map",
            &height_image,
        );

        queue.submit(std::iter::once(encoder.finish()));

        Self {
            diffuse_albedo,
            specular_albedo,
            specular_shape,
            normals,
            height,
            alpha: material.alpha,
            size: material.size(),
        }
    }
}

/// Widen a greyscale image to RGBA so every color map shares one format.
fn as_rgba(image: &FloatImage) -> FloatImage {
    if image.channels == 4 {
        return image.clone();
    }
    let mut out = FloatImage::new(image.width, image.height, 4);
    for y in 0..image.height {
        for x in 0..image.width {
            let v = image.sample(x, y, 0);
            for c in 0..3 {
                out.set(x, y, c, v);
            }
            out.set(x, y, 3, 1.0);
        }
    }
    out
}

/// Reduce a height field to its first channel.
fn as_single_channel(image: &FloatImage) -> FloatImage {
    if image.channels == 1 {
        return image.clone();
    }
    let mut out = FloatImage::new(image.width, image.height, 1);
    for y in 0..image.height {
        for x in 0..image.width {
            out.set(x, y, 0, image.sample(x, y, 0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_by_channels() {
        assert_eq!(image_format(&FloatImage::new(2, 2, 1)), wgpu::TextureFormat::R16Float);
        assert_eq!(image_format(&FloatImage::new(2, 2, 4)), wgpu::TextureFormat::Rgba16Float);
    }

    #[test]
    fn test_greyscale_widened_to_rgba() {
        let mut grey = FloatImage::new(2, 1, 1);
        grey.set(1, 0, 0, 0.5);
        let rgba = as_rgba(&grey);
        assert_eq!(rgba.channels, 4);
        assert_eq!(&rgba.pixels[4..8], &[0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_height_reduced_to_first_channel() {
        let mut rgba = FloatImage::new(1, 1, 4);
        rgba.pixels.copy_from_slice(&[0.25, 9.0, 9.0, 1.0]);
        assert_eq!(as_single_channel(&rgba).pixels, vec![0.25]);
    }

    #[test]
    fn test_half_conversion_preserves_values() {
        let mut img = FloatImage::new(1, 1, 1);
        img.set(0, 0, 0, 0.75);
        assert_eq!(to_half(&img)[0].to_f32(), 0.75);
    }
}
