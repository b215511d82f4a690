use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::MeshIoError;
use crate::mesh::TriMesh;

const BINARY_HEADER_SIZE: usize = 80;
const BINARY_TRIANGLE_SIZE: usize = 50;

/// Merges corners with bitwise identical coordinates into shared vertices.
#[derive(Default)]
struct VertexWelder {
    lookup: HashMap<[u64; 3], usize>,
    vertices: Vec<[f64; 3]>,
}

impl VertexWelder {
    fn insert(&mut self, p: [f64; 3]) -> usize {
        // +0.0 and -0.0 are the same vertex
        let key = p.map(|c| if c == 0.0 { 0u64 } else { c.to_bits() });
        let vertices = &mut self.vertices;
        *self.lookup.entry(key).or_insert_with(|| {
            vertices.push(p);
            vertices.len() - 1
        })
    }

    fn insert_triangle(&mut self, corners: [[f64; 3]; 3]) -> [usize; 3] {
        corners.map(|c| self.insert(c))
    }
}

fn is_binary(data: &[u8]) -> bool {
    if data.len() < BINARY_HEADER_SIZE + 4 {
        return false;
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&data[BINARY_HEADER_SIZE..BINARY_HEADER_SIZE + 4]);
    let num_triangles = u32::from_le_bytes(count) as usize;

    // some exporters write binary files whose header starts with "solid"
    data.len() == BINARY_HEADER_SIZE + 4 + num_triangles * BINARY_TRIANGLE_SIZE
        || !data.starts_with(b"solid")
}

fn parse_binary(data: &[u8]) -> Result<TriMesh, MeshIoError> {
    let body = &data[BINARY_HEADER_SIZE + 4..];
    let num_triangles = body.len() / BINARY_TRIANGLE_SIZE;
    if body.len() % BINARY_TRIANGLE_SIZE != 0 {
        return Err(MeshIoError::malformed(format!(
            "binary STL body of {} bytes is not a multiple of {BINARY_TRIANGLE_SIZE}",
            body.len()
        )));
    }

    let read_f32 = |bytes: &[u8]| -> f64 {
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        f32::from_le_bytes(word) as f64
    };

    let mut welder = VertexWelder::default();
    let mut faces = Vec::with_capacity(num_triangles);

    // each record: normal (3 f32), 3 corners (9 f32), attribute byte count (u16)
    for record in body.chunks_exact(BINARY_TRIANGLE_SIZE) {
        let mut corners = [[0.0; 3]; 3];
        for (k, corner) in corners.iter_mut().enumerate() {
            for (axis, c) in corner.iter_mut().enumerate() {
                let offset = 12 + (k * 3 + axis) * 4;
                *c = read_f32(&record[offset..offset + 4]);
            }
        }
        faces.push(welder.insert_triangle(corners));
    }

    Ok(TriMesh::new(welder.vertices, faces)?)
}

fn parse_ascii(text: &str) -> Result<TriMesh, MeshIoError> {
    let mut welder = VertexWelder::default();
    let mut faces = Vec::new();
    let mut corners = Vec::with_capacity(3);

    for (i, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let mut p = [0.0; 3];
                for c in p.iter_mut() {
                    *c = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| {
                        MeshIoError::malformed(format!("line {}: invalid vertex", i + 1))
                    })?;
                }
                corners.push(p);
            }
            Some("endloop") => {
                if corners.len() != 3 {
                    return Err(MeshIoError::malformed(format!(
                        "line {}: facet with {} vertices",
                        i + 1,
                        corners.len()
                    )));
                }
                faces.push(welder.insert_triangle([corners[0], corners[1], corners[2]]));
                corners.clear();
            }
            _ => {}
        }
    }

    Ok(TriMesh::new(welder.vertices, faces)?)
}

/// Parse an ASCII or binary STL stream into a triangle mesh.
///
/// STL stores every facet with its own corners, shared corners are merged.
pub fn parse_stl<R: Read>(mut reader: R) -> Result<TriMesh, MeshIoError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    if is_binary(&data) {
        parse_binary(&data)
    } else {
        let text = std::str::from_utf8(&data)
            .map_err(|_| MeshIoError::malformed("ASCII STL is not valid UTF-8"))?;
        parse_ascii(text)
    }
}

/// Read an ASCII or binary STL file into a triangle mesh.
pub fn read_stl(path: impl AsRef<Path>) -> Result<TriMesh, MeshIoError> {
    let file = std::fs::File::open(path)?;
    parse_stl(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut data = vec![0u8; BINARY_HEADER_SIZE];
        data[..5].copy_from_slice(b"solid");
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            data.extend_from_slice(&[0u8; 12]);
            for corner in tri {
                for c in corner {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_stl_ascii_merges_vertices() -> Result<(), MeshIoError> {
        let data = "solid square\n\
                    facet normal 0 0 1\n outer loop\n\
                    vertex 0 0 0\n vertex 1 0 0\n vertex 1 1 0\n\
                    endloop\n endfacet\n\
                    facet normal 0 0 1\n outer loop\n\
                    vertex 0 0 0\n vertex 1 1 0\n vertex 0 1 0\n\
                    endloop\n endfacet\n\
                    endsolid square\n";
        let mesh = parse_stl(data.as_bytes())?;
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);
        Ok(())
    }

    #[test]
    fn test_parse_stl_binary_with_solid_header() -> Result<(), MeshIoError> {
        let data = binary_stl(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.5]],
        ]);
        let mesh = parse_stl(data.as_slice())?;
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.faces(), &[[0, 1, 2], [1, 2, 3]]);
        assert_eq!(mesh.vertices()[3], [0.0, 0.0, -1.5]);
        Ok(())
    }

    #[test]
    fn test_read_stl_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::Builder::new().suffix(".stl").tempfile()?;
        file.write_all(&binary_stl(&[[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
        ]]))?;
        let mesh = crate::io::read_triangle_mesh(file.path())?;
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.face_areas(), vec![2.0]);
        Ok(())
    }

    #[test]
    fn test_parse_stl_ascii_bad_facet() {
        let data = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nendloop\nendfacet\n";
        assert!(matches!(
            parse_stl(data.as_bytes()),
            Err(MeshIoError::Malformed(_))
        ));
    }
}
