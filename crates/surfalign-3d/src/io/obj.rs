use std::io::BufRead;
use std::path::Path;

use super::{fan_triangulate, MeshIoError};
use crate::mesh::TriMesh;

fn parse_coords(
    parts: &mut std::str::SplitWhitespace<'_>,
    line_no: usize,
) -> Result<[f64; 3], MeshIoError> {
    let mut coords = [0.0; 3];
    for c in coords.iter_mut() {
        *c = parts
            .next()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| MeshIoError::malformed(format!("line {line_no}: invalid vertex")))?;
    }
    Ok(coords)
}

// `f` entries may be `v`, `v/vt`, `v//vn` or `v/vt/vn`; only the position index matters.
// Negative indices count backwards from the last vertex read so far.
fn parse_face_index(
    token: &str,
    num_vertices: usize,
    line_no: usize,
) -> Result<usize, MeshIoError> {
    let raw = token.split('/').next().unwrap_or_default();
    let idx = raw.parse::<i64>().map_err(|_| {
        MeshIoError::malformed(format!("line {line_no}: invalid face index {token}"))
    })?;

    let resolved = match idx {
        i if i > 0 => i - 1,
        i if i < 0 => num_vertices as i64 + i,
        _ => -1,
    };

    if resolved < 0 {
        return Err(MeshIoError::malformed(format!(
            "line {line_no}: face index {token} out of range"
        )));
    }

    Ok(resolved as usize)
}

/// Parse a Wavefront OBJ stream into a triangle mesh.
///
/// Only `v` and `f` statements are used. Polygons are fan triangulated.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<TriMesh, MeshIoError> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut polygon = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("v") => vertices.push(parse_coords(&mut parts, line_no)?),
            Some("f") => {
                polygon.clear();
                for token in parts {
                    polygon.push(parse_face_index(token, vertices.len(), line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(MeshIoError::malformed(format!(
                        "line {line_no}: face with fewer than 3 vertices"
                    )));
                }
                fan_triangulate(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    Ok(TriMesh::new(vertices, faces)?)
}

/// Read a Wavefront OBJ file into a triangle mesh.
pub fn read_obj(path: impl AsRef<Path>) -> Result<TriMesh, MeshIoError> {
    let file = std::fs::File::open(path)?;
    parse_obj(std::io::BufReader::new(file))
}
