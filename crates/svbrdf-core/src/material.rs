//! Captured SVBRDF materials on disk.

use std::path::{Path, PathBuf};

use crate::error::SvbrdfError;
use crate::pfm::{load_pfm, FloatImage};

/// Sub-directory of a material holding its reconstructed maps.
pub const MAP_DIR: &str = "out/reverse";
pub const PARAMS_FILE: &str = "map_params.dat";

/// A loaded material. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub diffuse_albedo: FloatImage,
    pub specular_albedo: FloatImage,
    pub specular_shape: FloatImage,
    pub normals: FloatImage,
    /// Height field kept on the CPU for grid generation.
    pub height_map: Option<FloatImage>,
    pub alpha: f32,
}

impl Material {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_height_map(&self) -> bool {
        self.height_map.as_ref().is_some_and(|h| !h.is_empty())
    }

    pub fn size_bytes(&self) -> usize {
        [
            &self.diffuse_albedo,
            &self.specular_albedo,
            &self.specular_shape,
            &self.normals,
        ]
        .iter()
        .map(|img| img.size_bytes())
        .sum::<usize>()
            + self.height_map.as_ref().map_or(0, FloatImage::size_bytes)
    }
}

/// Parse the BRDF `alpha` exponent: the first whitespace-separated float.
pub fn parse_alpha(path: &Path, text: &str) -> Result<f32, SvbrdfError> {
    text.split_whitespace()
        .next()
        .and_then(|t| t.parse::<f32>().ok())
        .ok_or_else(|| SvbrdfError::InvalidParams(path.to_path_buf()))
}

/// Depth-first search for the first file called `file_name` under `root`.
///
/// Directory entries are visited in sorted order so the result is stable.
pub fn search_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    if let Some(hit) = entries
        .iter()
        .find(|p| p.is_file() && p.file_name().is_some_and(|n| n == file_name))
    {
        return Some(hit.clone());
    }
    entries
        .iter()
        .filter(|p| p.is_dir())
        .find_map(|dir| search_file(dir, file_name))
}

/// Load the material `name` from `<data_root>/<name>/out/reverse/`.
///
/// The height field is optional. It is the first `normals_<name>.pfm` found
/// anywhere below `data_root`.
pub fn load_material(data_root: &Path, name: &str) -> Result<Material, SvbrdfError> {
    log::info!("Loading SVBRDF \"{name}\"...");
    let start = std::time::Instant::now();

    let path = data_root.join(name);
    let maps = path.join(MAP_DIR);

    let diffuse_albedo = load_pfm(&maps.join("map_diff.pfm"))?;
    let specular_albedo = load_pfm(&maps.join("map_spec.pfm"))?;
    let specular_shape = load_pfm(&maps.join("map_spec_shape.pfm"))?;
    let normals = load_pfm(&maps.join("map_normal.pfm"))?;

    let height_map = match search_file(data_root, &format!("normals_{name}.pfm")) {
        Some(file) => Some(load_pfm(&file)?),
        None => {
            log::warn!("Could not find heightmap for \"{name}\". Displacement mapping disabled.");
            None
        }
    };

    let params_path = maps.join(PARAMS_FILE);
    let params =
        std::fs::read_to_string(&params_path).map_err(|e| SvbrdfError::io(&params_path, e))?;
    let alpha = parse_alpha(&params_path, &params)?;

    let material = Material {
        name: name.to_string(),
        path,
        width: diffuse_albedo.width,
        height: diffuse_albedo.height,
        diffuse_albedo,
        specular_albedo,
        specular_shape,
        normals,
        height_map,
        alpha,
    };

    let mb = material.size_bytes() as f64 / (1024.0 * 1024.0);
    let secs = start.elapsed().as_secs_f64();
    log::info!(
        "Loaded {} x {} ({mb:.2} MB) in {secs:.2} s",
        material.width,
        material.height
    );
    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pfm::encode_pfm;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("svbrdf-material-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_material(root: &Path, name: &str, alpha: &str) {
        let maps = root.join(name).join(MAP_DIR);
        std::fs::create_dir_all(&maps).unwrap();
        let mut rgba = FloatImage::new(4, 2, 4);
        for px in rgba.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[0.5, 0.25, 0.125, 1.0]);
        }
        for map in ["map_diff", "map_spec", "map_spec_shape", "map_normal"] {
            std::fs::write(maps.join(format!("{map}.pfm")), encode_pfm(&rgba)).unwrap();
        }
        std::fs::write(maps.join(PARAMS_FILE), alpha).unwrap();
    }

    #[test]
    fn test_parse_alpha_reads_first_float() {
        let p = Path::new("map_params.dat");
        assert_eq!(parse_alpha(p, "  1.75 0.2 0.3\n").unwrap(), 1.75);
        assert!(matches!(parse_alpha(p, "abc"), Err(SvbrdfError::InvalidParams(_))));
        assert!(parse_alpha(p, "").is_err());
    }

    #[test]
    fn test_load_material_without_height_map() {
        let root = temp_root("noheight");
        write_material(&root, "leather", "2.5");
        let material = load_material(&root, "leather").unwrap();
        assert_eq!(material.size(), (4, 2));
        assert_eq!(material.alpha, 2.5);
        assert!(!material.has_height_map());
        assert_eq!(material.diffuse_albedo.sample(3, 1, 1), 0.25);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_load_material_finds_nested_height_map() {
        let root = temp_root("height");
        write_material(&root, "wood", "1.0");
        let nested = root.join("heights").join("batch");
        std::fs::create_dir_all(&nested).unwrap();
        let mut hm = FloatImage::new(4, 2, 1);
        hm.set(1, 0, 0, 0.75);
        std::fs::write(nested.join("normals_wood.pfm"), encode_pfm(&hm)).unwrap();

        let material = load_material(&root, "wood").unwrap();
        assert!(material.has_height_map());
        assert_eq!(material.height_map.as_ref().unwrap().sample(1, 0, 0), 0.75);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_maps_is_an_error() {
        let root = temp_root("missing");
        assert!(matches!(
            load_material(&root, "nothing"),
            Err(SvbrdfError::Io { .. })
        ));
        let _ = std::fs::remove_dir_all(&root);
    }
}
