//! Reading OBJ files and their material libraries from disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mesh_model::obj::{self, Normalization, ObjError};
use mesh_model::MeshRecord;

/// World position a freshly loaded object is placed at, in front of the
/// default camera.
pub const PLACEMENT: [f32; 3] = [0.0, 0.0, -3.0];

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: ObjError },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            LoadError::Parse { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
        }
    }
}

/// Meshes of one OBJ file, one per material, plus the fit-to-view transform.
#[derive(Debug)]
pub struct LoadedObj {
    pub name: String,
    pub records: Vec<MeshRecord>,
    pub normalization: Normalization,
}

/// Parse an OBJ file and the `mtllib` it names (relative to the file).
/// A missing or malformed material library only costs the colors.
pub fn read_obj(path: &Path) -> Result<LoadedObj, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data = obj::parse_obj(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = match &data.mtllib {
        Some(name) => read_mtl(&path.with_file_name(name)),
        None => HashMap::new(),
    };

    let records = obj::assign_materials(&data, &materials);
    let normalization = obj::normalize(&data);
    tracing::info!(
        "Loaded {} ({} vertices, {} faces, {} materials)",
        path.display(),
        data.vertices.len(),
        data.faces.len(),
        records.len()
    );

    Ok(LoadedObj {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        records,
        normalization,
    })
}

fn read_mtl(path: &Path) -> HashMap<String, obj::Material> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Material library {} unavailable: {e}", path.display());
            return HashMap::new();
        }
    };
    match obj::parse_mtl(&text) {
        Ok(materials) => materials,
        Err(e) => {
            tracing::warn!("Ignoring malformed material library {}: {e}", path.display());
            HashMap::new()
        }
    }
}
