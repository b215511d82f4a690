use std::path::{Path, PathBuf};

use crate::mesh::{MeshError, TriMesh};

/// OBJ reader module.
pub mod obj;

/// OFF reader module.
pub mod off;

/// PLY reader module.
pub mod ply;

/// STL reader module.
pub mod stl;

/// Error types for the mesh io module.
#[derive(Debug, thiserror::Error)]
pub enum MeshIoError {
    /// Failed to read the mesh file
    #[error("Failed to read mesh file")]
    Io(#[from] std::io::Error),

    /// The file content does not follow the format
    #[error("Malformed mesh data: {0}")]
    Malformed(String),

    /// The file extension is not a supported mesh format
    #[error("Invalid mesh file extension. Got:{0}")]
    InvalidFileExtension(String),

    /// The parsed mesh is not valid
    #[error("Invalid mesh")]
    InvalidMesh(#[from] MeshError),

    /// Reading a specific file failed
    #[error("Failed to read mesh {path}: {source}")]
    File {
        /// The offending path.
        path: PathBuf,
        /// The underlying error.
        source: Box<MeshIoError>,
    },
}

impl MeshIoError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        MeshIoError::Malformed(msg.into())
    }
}

/// Convert a polygon to triangles with a fan around its first corner.
pub(crate) fn fan_triangulate(polygon: &[usize], faces: &mut Vec<[usize; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

fn read_by_extension(path: &Path) -> Result<TriMesh, MeshIoError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "obj" => obj::read_obj(path),
        "off" => off::read_off(path),
        "ply" => ply::read_ply(path),
        "stl" => stl::read_stl(path),
        _ => Err(MeshIoError::InvalidFileExtension(extension)),
    }
}

/// Read a triangle mesh, choosing the format from the file extension.
///
/// Supported extensions are `obj`, `off`, `ply` and `stl`. Polygonal faces are
/// triangulated. Any failure is reported together with the offending path.
///
/// # Arguments
///
/// * `path` - The path to the mesh file.
pub fn read_triangle_mesh(path: impl AsRef<Path>) -> Result<TriMesh, MeshIoError> {
    let path = path.as_ref();
    let mesh = read_by_extension(path).map_err(|e| MeshIoError::File {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    log::debug!(
        "Read mesh {}: {} vertices, {} faces",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );

    Ok(mesh)
}
