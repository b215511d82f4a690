use rand::{rngs::StdRng, SeedableRng};
use surfalign_3d::mesh::{RowMatrix, TriMesh};

use crate::IcpError;

pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn mesh_from_matrices(
    name: &str,
    v: &RowMatrix<f64>,
    f: &RowMatrix<u32>,
) -> Result<TriMesh, IcpError> {
    if v.cols() != 3 || f.cols() != 3 {
        return Err(IcpError::InvalidInput(format!(
            "V{name} and F{name} must have 3 columns, got {} and {}",
            v.cols(),
            f.cols()
        )));
    }
    Ok(TriMesh::from_matrices(v, f)?)
}

pub(crate) fn ensure_not_empty(a: &TriMesh, b: &TriMesh) -> Result<(), IcpError> {
    for (name, mesh) in [("A", a), ("B", b)] {
        if mesh.is_empty() {
            return Err(IcpError::InvalidInput(format!(
                "mesh {name} is empty ({} vertices, {} faces)",
                mesh.num_vertices(),
                mesh.num_faces()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_from_matrices_columns() -> Result<(), Box<dyn std::error::Error>> {
        let v = RowMatrix::from_rows(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let f = RowMatrix::from_rows(&[[0u32, 1, 2]]);
        assert_eq!(mesh_from_matrices("A", &v, &f)?.num_faces(), 1);

        let v2 = RowMatrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let err = mesh_from_matrices("A", &v2, &f).unwrap_err();
        assert!(matches!(err, IcpError::InvalidInput(ref msg) if msg.contains("VA")));

        let f4 = RowMatrix::from_rows(&[[0u32, 1, 2, 0]]);
        assert!(matches!(
            mesh_from_matrices("B", &v, &f4),
            Err(IcpError::InvalidInput(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ensure_not_empty() -> Result<(), Box<dyn std::error::Error>> {
        let tri = TriMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 2]])?;
        let empty = TriMesh::new(vec![[0.0; 3]; 3], vec![])?;
        assert!(ensure_not_empty(&tri, &tri).is_ok());
        assert!(matches!(
            ensure_not_empty(&tri, &empty),
            Err(IcpError::InvalidInput(ref msg)) if msg.contains("mesh B")
        ));
        Ok(())
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;
        let a = rng_from_seed(Some(5)).random::<u64>();
        let b = rng_from_seed(Some(5)).random::<u64>();
        assert_eq!(a, b);
    }
}
