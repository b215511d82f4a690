use std::io::Read;
use std::path::Path;

use super::{fan_triangulate, MeshIoError};
use crate::mesh::TriMesh;

struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = &'a str> + 'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        // comments run until the end of the line
        let inner = text
            .lines()
            .flat_map(|l| l.split('#').next().unwrap_or_default().split_whitespace());
        Self {
            inner: Box::new(inner),
        }
    }

    fn next_str(&mut self, what: &str) -> Result<&'a str, MeshIoError> {
        self.inner
            .next()
            .ok_or_else(|| MeshIoError::malformed(format!("unexpected end of file reading {what}")))
    }

    fn next<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, MeshIoError> {
        let token = self.next_str(what)?;
        token
            .parse::<T>()
            .map_err(|_| MeshIoError::malformed(format!("invalid {what}: {token}")))
    }
}

/// Parse an ASCII OFF stream into a triangle mesh.
///
/// Polygonal faces are fan triangulated. Optional face colors are ignored.
pub fn parse_off<R: Read>(mut reader: R) -> Result<TriMesh, MeshIoError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut tokens = Tokens::new(&text);
    let magic = tokens.next_str("header")?;
    if magic != "OFF" {
        return Err(MeshIoError::malformed(format!("expected OFF header, got {magic}")));
    }

    let num_vertices: usize = tokens.next("vertex count")?;
    let num_faces: usize = tokens.next("face count")?;
    let _num_edges: usize = tokens.next("edge count")?;

    let mut vertices = Vec::new();
    for _ in 0..num_vertices {
        vertices.push([
            tokens.next("vertex coordinate")?,
            tokens.next("vertex coordinate")?,
            tokens.next("vertex coordinate")?,
        ]);
    }

    let mut faces = Vec::new();
    let mut polygon = Vec::new();
    for _ in 0..num_faces {
        let n: usize = tokens.next("face size")?;
        if n < 3 {
            return Err(MeshIoError::malformed(format!("face with {n} vertices")));
        }
        polygon.clear();
        for _ in 0..n {
            polygon.push(tokens.next::<usize>("face index")?);
        }
        fan_triangulate(&polygon, &mut faces);
    }

    Ok(TriMesh::new(vertices, faces)?)
}

/// Read an ASCII OFF file into a triangle mesh.
pub fn read_off(path: impl AsRef<Path>) -> Result<TriMesh, MeshIoError> {
    let file = std::fs::File::open(path)?;
    parse_off(std::io::BufReader::new(file))
}
