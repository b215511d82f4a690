use glam::DVec3;

/// Error types for mesh construction and validation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MeshError {
    /// The matrix has the wrong number of columns.
    #[error("{name} must have {expected} columns, got {actual}")]
    InvalidColumns {
        /// Label of the offending matrix.
        name: &'static str,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns.
        actual: usize,
    },

    /// The data length does not match the requested shape.
    #[error("Invalid matrix shape {rows}x{cols} for {len} elements")]
    InvalidShape {
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        cols: usize,
        /// Number of elements provided.
        len: usize,
    },

    /// A face references a vertex that does not exist.
    #[error("Face {face} references vertex {index} but the mesh has {num_vertices} vertices")]
    IndexOutOfBounds {
        /// Index of the offending face.
        face: usize,
        /// The out of range vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        num_vertices: usize,
    },

    /// The mesh has no vertices or no faces.
    #[error("Mesh is empty ({num_vertices} vertices, {num_faces} faces)")]
    EmptyMesh {
        /// Number of vertices in the mesh.
        num_vertices: usize,
        /// Number of faces in the mesh.
        num_faces: usize,
    },
}

/// A dense row-major matrix with a runtime shape.
///
/// This is the boundary type for callers holding raw `V` (N x 3) and `F` (M x 3)
/// matrices whose column count has not been checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatrix<T> {
    data: Vec<T>,
    shape: [usize; 2],
}

impl<T: Copy> RowMatrix<T> {
    /// Create a matrix from a shape `[rows, cols]` and row-major data.
    pub fn from_shape_vec(shape: [usize; 2], data: Vec<T>) -> Result<Self, MeshError> {
        if shape[0] * shape[1] != data.len() {
            return Err(MeshError::InvalidShape {
                rows: shape[0],
                cols: shape[1],
                len: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Create a matrix from fixed-size rows.
    pub fn from_rows<const C: usize>(rows: &[[T; C]]) -> Self {
        Self {
            data: rows.iter().flatten().copied().collect(),
            shape: [rows.len(), C],
        }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Get a row as a slice.
    pub fn row(&self, i: usize) -> &[T] {
        let cols = self.shape[1];
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Iterate over the rows as slices.
    pub fn row_iter(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact panics on a zero chunk size
        let cols = self.shape[1].max(1);
        self.data.chunks_exact(cols).take(self.shape[0])
    }

    /// Get the raw row-major data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// A triangle mesh: a vertex list and a list of vertex index triples.
///
/// Every face index is guaranteed to be smaller than the number of vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct TriMesh {
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Create a new mesh, checking that all face indices are in range.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        let num_vertices = vertices.len();
        for (face_idx, face) in faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&i| i >= num_vertices) {
                return Err(MeshError::IndexOutOfBounds {
                    face: face_idx,
                    index,
                    num_vertices,
                });
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Create a mesh from raw `V` and `F` matrices.
    ///
    /// Both matrices must have exactly 3 columns.
    pub fn from_matrices(v: &RowMatrix<f64>, f: &RowMatrix<u32>) -> Result<Self, MeshError> {
        check_columns("V", v.cols())?;
        check_columns("F", f.cols())?;

        let vertices = v.row_iter().map(|r| [r[0], r[1], r[2]]).collect();
        let faces = f
            .row_iter()
            .map(|r| [r[0] as usize, r[1] as usize, r[2] as usize])
            .collect();

        Self::new(vertices, faces)
    }

    /// Get the vertices of the mesh.
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// Get the faces of the mesh.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Fail with [`MeshError::EmptyMesh`] if the mesh has no vertices or no faces.
    pub fn ensure_not_empty(&self) -> Result<(), MeshError> {
        if self.is_empty() {
            return Err(MeshError::EmptyMesh {
                num_vertices: self.num_vertices(),
                num_faces: self.num_faces(),
            });
        }
        Ok(())
    }

    /// Get the three corners of a face.
    #[inline]
    pub fn triangle(&self, face: usize) -> [DVec3; 3] {
        let [a, b, c] = self.faces[face];
        [
            DVec3::from_array(self.vertices[a]),
            DVec3::from_array(self.vertices[b]),
            DVec3::from_array(self.vertices[c]),
        ]
    }

    /// Area of each face.
    pub fn face_areas(&self) -> Vec<f64> {
        (0..self.faces.len())
            .map(|f| {
                let [a, b, c] = self.triangle(f);
                0.5 * (b - a).cross(c - a).length()
            })
            .collect()
    }

    /// Unit normal of each face, zero for degenerate faces.
    pub fn face_normals(&self) -> Vec<DVec3> {
        (0..self.faces.len())
            .map(|f| {
                let [a, b, c] = self.triangle(f);
                (b - a).cross(c - a).normalize_or_zero()
            })
            .collect()
    }

    /// Apply an affine transform to every vertex.
    pub fn transformed(&self, transform: &glam::DMat4) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|v| transform.transform_point3(DVec3::from_array(*v)).to_array())
            .collect();
        Self {
            vertices,
            faces: self.faces.clone(),
        }
    }
}

fn check_columns(name: &'static str, actual: usize) -> Result<(), MeshError> {
    if actual != 3 {
        return Err(MeshError::InvalidColumns {
            name,
            expected: 3,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> TriMesh {
        TriMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_trimesh_smoke() {
        let mesh = unit_square();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        assert!(!mesh.is_empty());
        assert!(mesh.ensure_not_empty().is_ok());
    }

    #[test]
    fn test_trimesh_index_out_of_bounds() {
        let res = TriMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 3]]);
        assert_eq!(
            res,
            Err(MeshError::IndexOutOfBounds {
                face: 0,
                index: 3,
                num_vertices: 3
            })
        );
    }

    #[test]
    fn test_trimesh_empty() {
        let mesh = TriMesh::new(vec![[0.0; 3]; 3], vec![]).unwrap();
        assert!(mesh.is_empty());
        assert!(matches!(
            mesh.ensure_not_empty(),
            Err(MeshError::EmptyMesh {
                num_vertices: 3,
                num_faces: 0
            })
        ));
    }

    #[test]
    fn test_from_matrices() -> Result<(), MeshError> {
        let v = RowMatrix::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let f = RowMatrix::from_rows(&[[0u32, 1, 2]]);
        let mesh = TriMesh::from_matrices(&v, &f)?;
        assert_eq!(mesh.faces(), &[[0, 1, 2]]);
        assert_eq!(mesh.vertices()[1], [1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_from_matrices_wrong_columns() -> Result<(), MeshError> {
        let v = RowMatrix::from_shape_vec([3, 2], vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0])?;
        let f = RowMatrix::from_rows(&[[0u32, 1, 2]]);
        assert_eq!(
            TriMesh::from_matrices(&v, &f),
            Err(MeshError::InvalidColumns {
                name: "V",
                expected: 3,
                actual: 2
            })
        );

        let v = RowMatrix::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let f = RowMatrix::from_rows(&[[0u32, 1, 2, 0]]);
        assert!(matches!(
            TriMesh::from_matrices(&v, &f),
            Err(MeshError::InvalidColumns { name: "F", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_row_matrix_invalid_shape() {
        let res = RowMatrix::from_shape_vec([2, 3], vec![0.0; 5]);
        assert!(matches!(res, Err(MeshError::InvalidShape { len: 5, .. })));
    }

    #[test]
    fn test_face_areas_and_normals() {
        let mesh = unit_square();
        let areas = mesh.face_areas();
        assert_relative_eq!(areas[0], 0.5);
        assert_relative_eq!(areas[1], 0.5);

        for n in mesh.face_normals() {
            assert_relative_eq!(n.z, 1.0);
        }
    }

    #[test]
    fn test_transformed() {
        let mesh = unit_square();
        let t = glam::DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let moved = mesh.transformed(&t);
        assert_eq!(moved.vertices()[0], [1.0, 2.0, 3.0]);
        assert_eq!(moved.faces(), mesh.faces());
    }
}
