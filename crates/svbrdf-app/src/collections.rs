//! Materials and meshes discovered under the data directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use svbrdf_core::material::{load_material, PARAMS_FILE};
use svbrdf_core::mesh::load_obj_dir;
use svbrdf_core::{Material, MeshData, SvbrdfError};

/// Every file below `root` accepted by `keep`, depth-first in sorted order.
fn find_files(root: &Path, keep: &dyn Fn(&Path) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            found.extend(find_files(&path, keep));
        } else if keep(&path) {
            found.push(path);
        }
    }
    found
}

/// Wrap `index + step` into `0..len`.
pub fn step_index(index: usize, step: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as i64 + step as i64).rem_euclid(len as i64) as usize
}

/// Captured materials, named by the directory that holds `out/reverse/`.
#[derive(Debug, Clone, Default)]
pub struct MaterialCollection {
    root: PathBuf,
    names: Vec<String>,
}

impl MaterialCollection {
    pub fn scan(root: &Path) -> Self {
        let names: Vec<String> = find_files(root, &|p| {
            p.file_name().is_some_and(|n| n == PARAMS_FILE)
        })
        .iter()
        // <root>/<name>/out/reverse/map_params.dat
        .filter_map(|p| p.ancestors().nth(3)?.file_name()?.to_str().map(String::from))
        .collect();
        log::info!("Found {} SVBRDFs.", names.len());
        Self {
            root: root.to_path_buf(),
            names,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.names.iter().position(|n| n == name)
    }

    pub fn load(&self, index: usize) -> Result<Material, SvbrdfError> {
        let name = self
            .name(index)
            .ok_or_else(|| SvbrdfError::Config(format!("no material at index {index}")))?;
        load_material(&self.root, name)
    }
}

/// Directories holding at least one `.obj` file. All OBJ files of a
/// directory form one mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshCollection {
    dirs: Vec<PathBuf>,
}

impl MeshCollection {
    pub fn scan(root: &Path) -> Self {
        let dirs: BTreeSet<PathBuf> = find_files(root, &|p| {
            p.extension().is_some_and(|e| e.eq_ignore_ascii_case("obj"))
        })
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
        log::info!("Found {} meshes.", dirs.len());
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// A mesh is named by its directory.
    pub fn name(&self, index: usize) -> Option<String> {
        self.dirs
            .get(index)
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        (0..self.len()).find(|&i| self.name(i).as_deref() == Some(name))
    }

    pub fn load(&self, index: usize, target_triangle_area: f32) -> Result<MeshData, SvbrdfError> {
        let dir = self
            .dirs
            .get(index)
            .ok_or_else(|| SvbrdfError::Config(format!("no mesh at index {index}")))?;
        load_obj_dir(dir, target_triangle_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("svbrdf-collections-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "1.0\n").unwrap();
    }

    #[test]
    fn test_step_index_wraps() {
        assert_eq!(step_index(0, -1, 3), 2);
        assert_eq!(step_index(2, 1, 3), 0);
        assert_eq!(step_index(1, 1, 3), 2);
        assert_eq!(step_index(5, 1, 0), 0);
    }

    #[test]
    fn test_materials_named_by_third_parent() {
        let root = temp_root("materials");
        touch(&root.join("wood/out/reverse/map_params.dat"));
        touch(&root.join("batch/leather/out/reverse/map_params.dat"));
        touch(&root.join("wood/notes.txt"));

        let materials = MaterialCollection::scan(&root);
        assert_eq!(materials.len(), 2);
        assert_eq!(materials.name(0), Some("leather"));
        assert_eq!(materials.name(1), Some("wood"));
        assert_eq!(materials.index_of("wood"), Some(1));
        assert_eq!(materials.index_of("stone"), None);
        assert_eq!(materials.index_of(""), None);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_mesh_directories_deduplicated_and_sorted() {
        let root = temp_root("meshes");
        touch(&root.join("meshes/teapot/body.obj"));
        touch(&root.join("meshes/teapot/lid.OBJ"));
        touch(&root.join("meshes/bunny/bunny.obj"));
        touch(&root.join("meshes/bunny/readme.md"));

        let meshes = MeshCollection::scan(&root);
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes.name(0).as_deref(), Some("bunny"));
        assert_eq!(meshes.name(1).as_deref(), Some("teapot"));
        assert_eq!(meshes.index_of("teapot"), Some(1));
        assert_eq!(meshes.index_of("tea"), None);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let materials = MaterialCollection::scan(Path::new("/nonexistent/svbrdf-data"));
        assert!(materials.is_empty());
        assert!(materials.load(0).is_err());
        assert!(MeshCollection::scan(Path::new("/nonexistent/svbrdf-data")).is_empty());
    }
}
