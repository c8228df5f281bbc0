use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};

use crate::constants::{MAX_REFINED_VERTICES, MAX_TESSELLATION};
use crate::error::SvbrdfError;

/// Mesh vertex. Must match `VertexInput` in the mesh shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tessellation: f32,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, tessellation: f32) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            tessellation,
        }
    }

    fn pos(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    fn tex(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }
}

/// Indexed triangle list with a normalization scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Distance of the furthest vertex from the origin.
    pub scale: f32,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }
}

/// Recompute vertex normals as the normalized average of incident face normals.
///
/// Triangles are assumed to wind counter-clockwise.
pub fn compute_vertex_normals(mesh: &mut MeshData) {
    let mut sums = vec![Vec3::ZERO; mesh.vertices.len()];
    let mut counts = vec![0u32; mesh.vertices.len()];

    for [i0, i1, i2] in mesh.triangles() {
        let a = mesh.vertices[i0].pos();
        let b = mesh.vertices[i1].pos();
        let c = mesh.vertices[i2].pos();
        let n = (b - a).cross(c - a).normalize_or_zero();
        for i in [i0, i1, i2] {
            sums[i] += n;
            counts[i] += 1;
        }
    }

    for ((v, sum), count) in mesh.vertices.iter_mut().zip(sums).zip(counts) {
        let n = if count == 0 {
            Vec3::ZERO
        } else {
            (sum / count as f32).normalize_or_zero()
        };
        v.normal = n.to_array();
    }
}

/// Per-vertex tessellation factors from UV-space triangle area.
///
/// Each triangle wants `sqrt(area / target)` so that its subdivided pieces reach
/// `target`. A vertex keeps the largest factor among its triangles.
pub fn compute_tessellation_factors(mesh: &mut MeshData, target_triangle_area: f32) {
    for v in &mut mesh.vertices {
        v.tessellation = 1.0;
    }
    if target_triangle_area <= 0.0 {
        return;
    }

    let tris: Vec<[usize; 3]> = mesh.triangles().collect();
    for [i0, i1, i2] in tris {
        let uv0 = mesh.vertices[i0].tex();
        let u = mesh.vertices[i1].tex() - uv0;
        let v = mesh.vertices[i2].tex() - uv0;
        let area = 0.5 * u.perp_dot(v).abs();
        let factor = if area <= 0.0 {
            1.0
        } else {
            (area / target_triangle_area).sqrt()
        };
        for i in [i0, i1, i2] {
            let t = &mut mesh.vertices[i].tessellation;
            *t = t.max(factor);
        }
    }

    if !mesh.vertices.is_empty() {
        let (min, max, sum) = mesh.vertices.iter().fold(
            (f32::MAX, f32::MIN, 0.0f64),
            |(lo, hi, s), v| (lo.min(v.tessellation), hi.max(v.tessellation), s + v.tessellation as f64),
        );
        log::debug!(
            "Tessellation min/avg/max: {min} / {} / {max}",
            sum / mesh.vertices.len() as f64
        );
    }
}

/// UV-space triangle area that gives about `density` texels per vertex along each axis.
pub fn target_triangle_area(width: u32, height: u32, density: f32) -> f32 {
    let target_u = 1.0 / (width as f32 / density);
    let target_v = 1.0 / (height as f32 / density);
    target_u * target_v / 2.0
}

/// Subdivision level used when refining `mesh` on the CPU for GPU displacement.
///
/// The level is the rounded largest vertex factor, clamped to [1, 64], then
/// reduced until the refined mesh fits the vertex budget.
pub fn refinement_level(mesh: &MeshData) -> u32 {
    let max_factor = mesh
        .vertices
        .iter()
        .map(|v| v.tessellation)
        .fold(1.0f32, f32::max);
    let mut level = (max_factor.round() as u32).clamp(1, MAX_TESSELLATION);
    let tris = mesh.triangle_count();
    while level > 1 && tris * refined_vertices_per_triangle(level) > MAX_REFINED_VERTICES {
        level -= 1;
    }
    level
}

fn refined_vertices_per_triangle(level: u32) -> usize {
    let n = level as usize;
    (n + 1) * (n + 2) / 2
}

/// Uniformly subdivide every triangle into `level`² triangles.
///
/// Attributes are interpolated barycentrically, so edges shared by two input
/// triangles produce coincident vertices and the result has no cracks.
pub fn refine_uniform(mesh: &MeshData, level: u32) -> MeshData {
    let n = level.max(1);
    if n == 1 {
        return mesh.clone();
    }

    let per_tri = refined_vertices_per_triangle(n);
    let mut out = MeshData {
        vertices: Vec::with_capacity(mesh.triangle_count() * per_tri),
        indices: Vec::with_capacity(mesh.triangle_count() * (n * n * 3) as usize),
        scale: mesh.scale,
    };

    // Row-major lattice index of (i, j) with i + j <= n.
    let lattice = |i: u32, j: u32| -> u32 { i * (n + 1) - i * (i.saturating_sub(1)) / 2 + j };

    for [i0, i1, i2] in mesh.triangles() {
        let (a, b, c) = (mesh.vertices[i0], mesh.vertices[i1], mesh.vertices[i2]);
        let base = out.vertices.len() as u32;

        for i in 0..=n {
            for j in 0..=(n - i) {
                let wb = j as f32 / n as f32;
                let wc = i as f32 / n as f32;
                let wa = 1.0 - wb - wc;
                let mix3 = |x: [f32; 3], y: [f32; 3], z: [f32; 3]| {
                    Vec3::from_array(x) * wa + Vec3::from_array(y) * wb + Vec3::from_array(z) * wc
                };
                let uv = a.tex() * wa + b.tex() * wb + c.tex() * wc;
                out.vertices.push(Vertex::new(
                    mix3(a.position, b.position, c.position),
                    mix3(a.normal, b.normal, c.normal).normalize_or_zero(),
                    uv,
                    a.tessellation * wa + b.tessellation * wb + c.tessellation * wc,
                ));
            }
        }

        for i in 0..n {
            for j in 0..(n - i) {
                let p = base + lattice(i, j);
                let q = base + lattice(i, j + 1);
                let r = base + lattice(i + 1, j);
                out.indices.extend_from_slice(&[p, q, r]);
                if j + 1 < n - i {
                    let s = base + lattice(i + 1, j + 1);
                    out.indices.extend_from_slice(&[q, s, r]);
                }
            }
        }
    }

    out
}

/// Load every `.obj` file in `dir` into a single mesh.
///
/// OBJ files are Y-up; positions are converted to Z-up by swapping Y and Z
/// and negating the new Y.
pub fn load_obj_dir(dir: &Path, target_triangle_area: f32) -> Result<MeshData, SvbrdfError> {
    let files = obj_files_in(dir)?;
    let mut mesh = MeshData::default();

    for file in &files {
        let (models, _materials) = tobj::load_obj(
            file,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| SvbrdfError::MeshLoad {
            path: file.clone(),
            reason: e.to_string(),
        })?;

        for model in models {
            let m = &model.mesh;
            let base = mesh.vertices.len() as u32;
            for (k, p) in m.positions.chunks_exact(3).enumerate() {
                let (x, y, z) = (p[0], -p[2], p[1]);
                let uv = if m.texcoords.len() >= (k + 1) * 2 {
                    Vec2::new(m.texcoords[k * 2], 1.0 - m.texcoords[k * 2 + 1])
                } else {
                    Vec2::ZERO
                };
                let pos = Vec3::new(x, y, z);
                mesh.scale = mesh.scale.max(pos.length());
                mesh.vertices.push(Vertex::new(pos, Vec3::ZERO, uv, 0.0));
            }
            mesh.indices.extend(m.indices.iter().map(|&i| base + i));
        }
    }

    if mesh.is_empty() {
        return Err(SvbrdfError::EmptyMesh(dir.to_path_buf()));
    }

    compute_tessellation_factors(&mut mesh, target_triangle_area);
    compute_vertex_normals(&mut mesh);

    log::info!(
        "Loaded mesh \"{}\": {} vertices, {} triangles",
        dir.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn obj_files_in(dir: &Path) -> Result<Vec<PathBuf>, SvbrdfError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SvbrdfError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> MeshData {
        let n = Vec3::Z;
        MeshData {
            vertices: vec![
                Vertex::new(Vec3::new(0.0, 0.0, 0.0), n, Vec2::new(0.0, 0.0), 1.0),
                Vertex::new(Vec3::new(1.0, 0.0, 0.0), n, Vec2::new(1.0, 0.0), 1.0),
                Vertex::new(Vec3::new(0.0, 1.0, 0.0), n, Vec2::new(0.0, 1.0), 1.0),
                Vertex::new(Vec3::new(1.0, 1.0, 0.0), n, Vec2::new(1.0, 1.0), 1.0),
            ],
            indices: vec![0, 1, 2, 1, 3, 2],
            scale: 1.0,
        }
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn test_ccw_normals_point_up() {
        let mut mesh = unit_quad();
        for v in &mut mesh.vertices {
            v.normal = [0.0; 3];
        }
        compute_vertex_normals(&mut mesh);
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.normal) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_normals_are_unit_length_on_a_fold() {
        let mut mesh = unit_quad();
        mesh.vertices[3].position[2] = 1.0;
        compute_vertex_normals(&mut mesh);
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_tessellation_factor_is_sqrt_of_area_ratio() {
        let mut mesh = unit_quad();
        // Each triangle covers half of UV space.
        compute_tessellation_factors(&mut mesh, 0.5 / 16.0);
        for v in &mesh.vertices {
            assert!((v.tessellation - 4.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_non_positive_target_gives_unit_factors() {
        let mut mesh = unit_quad();
        compute_tessellation_factors(&mut mesh, 0.0);
        assert!(mesh.vertices.iter().all(|v| v.tessellation == 1.0));
    }

    #[test]
    fn test_target_triangle_area() {
        let area = target_triangle_area(1024, 512, 16.0);
        let expected = (16.0 / 1024.0) * (16.0 / 512.0) / 2.0;
        assert!((area - expected).abs() < 1e-9);
    }

    #[test]
    fn test_refine_uniform_counts() {
        let mesh = unit_quad();
        let refined = refine_uniform(&mesh, 4);
        assert_eq!(refined.triangle_count(), 2 * 16);
        assert_eq!(refined.vertices.len(), 2 * 15);
        assert!(refined.indices.iter().all(|&i| (i as usize) < refined.vertices.len()));
    }

    #[test]
    fn test_refine_preserves_winding() {
        let refined = refine_uniform(&unit_quad(), 3);
        for t in refined.indices.chunks_exact(3) {
            let a = Vec3::from_array(refined.vertices[t[0] as usize].position);
            let b = Vec3::from_array(refined.vertices[t[1] as usize].position);
            let c = Vec3::from_array(refined.vertices[t[2] as usize].position);
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn test_refinement_level_rounds_max_factor() {
        let mut mesh = unit_quad();
        mesh.vertices[2].tessellation = 6.4;
        assert_eq!(refinement_level(&mesh), 6);
        mesh.vertices[2].tessellation = 500.0;
        assert_eq!(refinement_level(&mesh), MAX_TESSELLATION);
    }
}
