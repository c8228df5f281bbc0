//! Height-field displacement geometry for the material quad.

use glam::{Vec2, Vec3};

use crate::constants::{MAX_TESSELLATION, QUAD_DIM};
use crate::mesh::{compute_vertex_normals, target_triangle_area, MeshData, Vertex};
use crate::modes::DisplacementMode;
use crate::pfm::FloatImage;

/// Half extents of the material quad. The shorter side spans `2 * QUAD_DIM`.
pub fn quad_extents(width: u32, height: u32) -> Vec2 {
    let smaller = width.min(height).max(1) as f32;
    Vec2::new(
        QUAD_DIM * width as f32 / smaller,
        QUAD_DIM * height as f32 / smaller,
    )
}

/// Pixels of height field per grid vertex, clamped to [1, MAX_TESSELLATION].
pub fn pixels_per_vertex(density: f32) -> u32 {
    let ppv = if density.is_finite() {
        density.ceil().max(1.0) as u32
    } else {
        1
    };
    ppv.min(MAX_TESSELLATION)
}

/// A flat, counter-clockwise quad facing +Z.
pub fn single_quad(extents: Vec2, tessellation: f32) -> MeshData {
    let (x, y) = (extents.x, extents.y);
    let n = Vec3::Z;
    MeshData {
        vertices: vec![
            Vertex::new(Vec3::new(-x, y, 0.0), n, Vec2::new(0.0, 0.0), tessellation),
            Vertex::new(Vec3::new(x, y, 0.0), n, Vec2::new(1.0, 0.0), tessellation),
            Vertex::new(Vec3::new(-x, -y, 0.0), n, Vec2::new(0.0, 1.0), tessellation),
            Vertex::new(Vec3::new(x, -y, 0.0), n, Vec2::new(1.0, 1.0), tessellation),
        ],
        indices: vec![0, 2, 1, 1, 2, 3],
        scale: 1.0,
    }
}

/// Displaced grid sampling the height field every `ppv` pixels.
///
/// Falls back to a single quad when there is no height field or the density is
/// below one pixel per vertex.
pub fn displaced_grid(
    material_size: (u32, u32),
    height_map: Option<&FloatImage>,
    extents: Vec2,
    density: f32,
    magnitude: f32,
    tessellation: f32,
) -> MeshData {
    let Some(height_map) = height_map.filter(|h| !h.is_empty()) else {
        log::warn!("No height map, using a single quad instead");
        return single_quad(extents, MAX_TESSELLATION as f32);
    };
    if !(density >= 1.0) {
        log::info!("Displacement density set to no-op, using a single quad instead");
        return single_quad(extents, MAX_TESSELLATION as f32);
    }

    let ppv = pixels_per_vertex(density);
    let w = material_size.0 / ppv;
    let h = material_size.1 / ppv;
    if w < 2 || h < 2 {
        log::warn!("Material too small for ppv {ppv}, using a single quad instead");
        return single_quad(extents, MAX_TESSELLATION as f32);
    }

    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;
    let mut vertices = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let height = height_map.sample(x * ppv, y * ppv, 0);
            let u = x as f32 / max_x;
            let v = y as f32 / max_y;
            let position = Vec3::new(
                (u * 2.0 - 1.0) * extents.x,
                ((1.0 - v) * 2.0 - 1.0) * extents.y,
                height * magnitude,
            );
            vertices.push(Vertex::new(position, Vec3::ZERO, Vec2::new(u, v), tessellation));
        }
    }

    let quads = ((w - 1) * (h - 1)) as usize;
    let mut indices = Vec::with_capacity(quads * 6);
    for qy in 0..h - 1 {
        for qx in 0..w - 1 {
            // Even quads split along B-C, odd quads along A-D.
            let a = qy * w + qx;
            let b = a + 1;
            let c = a + w;
            let d = c + 1;
            if (qx + qy) % 2 == 0 {
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            } else {
                indices.extend_from_slice(&[a, d, b, a, c, d]);
            }
        }
    }

    let mut mesh = MeshData {
        vertices,
        indices,
        scale: 1.0,
    };
    compute_vertex_normals(&mut mesh);

    log::info!(
        "Displacement mapped grid {w}x{h} with PPV = {ppv} and height = {magnitude:.3}"
    );
    mesh
}

/// Inputs for building the material quad geometry.
#[derive(Debug, Clone, Copy)]
pub struct QuadParams<'a> {
    pub material_size: (u32, u32),
    pub height_map: Option<&'a FloatImage>,
    pub mode: DisplacementMode,
    pub density: f32,
    pub magnitude: f32,
}

impl QuadParams<'_> {
    pub fn displacement_enabled(&self) -> bool {
        self.mode != DisplacementMode::None && self.density > 0.0 && self.magnitude != 0.0
    }
}

/// Geometry for the single-quad mesh mode.
///
/// CPU displacement bakes heights into a fine grid. GPU displacement builds a
/// flat coarse grid (64 pixels per vertex) whose tessellation factor brings
/// triangles down to the density's target area.
pub fn build_quad_mesh(params: &QuadParams) -> MeshData {
    let (w, h) = params.material_size;
    let extents = quad_extents(w, h);

    if !params.displacement_enabled() {
        return single_quad(extents, MAX_TESSELLATION as f32);
    }

    match params.mode {
        DisplacementMode::Cpu => displaced_grid(
            params.material_size,
            params.height_map,
            extents,
            params.density,
            params.magnitude,
            1.0,
        ),
        _ => {
            let coarse = MAX_TESSELLATION as f32;
            let target = target_triangle_area(w, h, params.density);
            let coarse_area = (extents.x / coarse) * (extents.y / coarse) / 2.0;
            let gpu_tess = (coarse_area / target).sqrt();
            displaced_grid(
                params.material_size,
                params.height_map,
                extents,
                coarse,
                0.0,
                gpu_tess,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> FloatImage {
        let mut img = FloatImage::new(width, height, 1);
        for y in 0..height {
            for x in 0..width {
                img.set(x, y, 0, x as f32 / width as f32);
            }
        }
        img
    }

    #[test]
    fn test_ppv_clamped() {
        assert_eq!(pixels_per_vertex(0.2), 1);
        assert_eq!(pixels_per_vertex(3.5), 4);
        assert_eq!(pixels_per_vertex(16.0), 16);
        assert_eq!(pixels_per_vertex(1000.0), 64);
    }

    #[test]
    fn test_quad_extents_follow_aspect() {
        let e = quad_extents(2048, 1024);
        assert!((e.x - 10.0).abs() < 1e-6);
        assert!((e.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_quad_layout() {
        let quad = single_quad(Vec2::new(5.0, 5.0), 64.0);
        assert_eq!(quad.indices, vec![0, 2, 1, 1, 2, 3]);
        assert_eq!(quad.vertices[0].position, [-5.0, 5.0, 0.0]);
        assert_eq!(quad.vertices[3].uv, [1.0, 1.0]);
        assert!(quad.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_grid_vertex_and_triangle_counts() {
        let hm = ramp(256, 128);
        for density in [1.0f32, 2.0, 3.0, 8.0, 16.0] {
            let mesh = displaced_grid((256, 128), Some(&hm), quad_extents(256, 128), density, 0.1, 1.0);
            let ppv = pixels_per_vertex(density);
            let (w, h) = (256 / ppv, 128 / ppv);
            assert_eq!(mesh.vertices.len(), (w * h) as usize, "density {density}");
            assert_eq!(mesh.triangle_count(), (2 * (w - 1) * (h - 1)) as usize);
        }
    }

    #[test]
    fn test_grid_heights_scale_with_magnitude() {
        let hm = ramp(64, 64);
        let mesh = displaced_grid((64, 64), Some(&hm), quad_extents(64, 64), 4.0, 2.0, 1.0);
        // Vertex (x=3, y=0) samples pixel 12.
        let v = mesh.vertices[3];
        assert!((v.position[2] - 2.0 * 12.0 / 64.0).abs() < 1e-6);
        assert_eq!(v.uv[1], 0.0);
    }

    #[test]
    fn test_grid_triangles_face_up_when_flat() {
        let hm = FloatImage::new(32, 32, 1);
        let mesh = displaced_grid((32, 32), Some(&hm), quad_extents(32, 32), 4.0, 1.0, 1.0);
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.normal) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_missing_height_map_falls_back_to_quad() {
        let mesh = displaced_grid((64, 64), None, quad_extents(64, 64), 4.0, 1.0, 1.0);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[0].tessellation, 64.0);
    }

    #[test]
    fn test_low_density_falls_back_to_quad() {
        let hm = ramp(64, 64);
        let mesh = displaced_grid((64, 64), Some(&hm), quad_extents(64, 64), 0.5, 1.0, 1.0);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_gpu_mode_builds_flat_coarse_grid() {
        let hm = ramp(1024, 1024);
        let mesh = build_quad_mesh(&QuadParams {
            material_size: (1024, 1024),
            height_map: Some(&hm),
            mode: DisplacementMode::Gpu,
            density: 16.0,
            magnitude: 0.05,
        });
        assert_eq!(mesh.vertices.len(), 16 * 16);
        assert!(mesh.vertices.iter().all(|v| v.position[2] == 0.0));
        let coarse_area = (5.0f32 / 64.0) * (5.0 / 64.0) / 2.0;
        let expected = (coarse_area / target_triangle_area(1024, 1024, 16.0)).sqrt();
        assert!((mesh.vertices[0].tessellation - expected).abs() < 1e-4);
    }

    #[test]
    fn test_zero_magnitude_disables_displacement() {
        let hm = ramp(64, 64);
        let params = QuadParams {
            material_size: (64, 64),
            height_map: Some(&hm),
            mode: DisplacementMode::Cpu,
            density: 4.0,
            magnitude: 0.0,
        };
        assert!(!params.displacement_enabled());
        assert_eq!(build_quad_mesh(&params).vertices.len(), 4);
    }
}
