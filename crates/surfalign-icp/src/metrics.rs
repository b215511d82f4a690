use rand::Rng;
use surfalign_3d::{mesh::TriMesh, sampling::sample_mesh_surface};

use crate::{matcher::Matcher, pointcloud::DataPoints, IcpError};

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Symmetric chamfer distance between two surfaces.
///
/// Samples `n` points on each mesh and returns
/// `sqrt(mean(d(A, B)^2)) + sqrt(mean(d(B, A)^2))` where `d(X, Y)` is the
/// distance from each sample of X to its nearest sample of Y.
///
/// # Arguments
///
/// * `a` - The first mesh.
/// * `b` - The second mesh.
/// * `n` - Number of samples per mesh, at least one.
/// * `rng` - Random source for the sampling.
pub fn chamfer_distance<R: Rng + ?Sized>(
    a: &TriMesh,
    b: &TriMesh,
    n: usize,
    rng: &mut R,
) -> Result<f64, IcpError> {
    if n == 0 {
        return Err(IcpError::InvalidInput(
            "chamfer distance needs at least one sample".to_string(),
        ));
    }

    let samples_a = DataPoints::from_points(&sample_mesh_surface(a, n, rng)?);
    let samples_b = DataPoints::from_points(&sample_mesh_surface(b, n, rng)?);

    let matcher = Matcher::default();
    let a_to_b = matcher.build(&samples_b).find(&samples_a);
    let b_to_a = matcher.build(&samples_a).find(&samples_b);

    Ok(mean(&a_to_b.dists).sqrt() + mean(&b_to_a.dists).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{DMat4, DVec3};
    use rand::{rngs::StdRng, SeedableRng};

    fn square(z: f64) -> TriMesh {
        TriMesh::new(
            vec![
                [0.0, 0.0, z],
                [1.0, 0.0, z],
                [1.0, 1.0, z],
                [0.0, 1.0, z],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_chamfer_same_surface_is_small() -> Result<(), IcpError> {
        let mut rng = StdRng::seed_from_u64(0);
        let d = chamfer_distance(&square(0.0), &square(0.0), 5000, &mut rng)?;
        assert!(d < 0.05, "chamfer {d}");
        Ok(())
    }

    #[test]
    fn test_chamfer_offset_planes() -> Result<(), IcpError> {
        let mut rng = StdRng::seed_from_u64(1);
        let a = square(0.0);
        let b = a.transformed(&DMat4::from_translation(DVec3::new(0.0, 0.0, 0.5)));
        let d = chamfer_distance(&a, &b, 5000, &mut rng)?;
        // each direction is at least the plane gap
        assert!(d >= 1.0);
        assert_relative_eq!(d, 1.0, epsilon = 0.02);
        Ok(())
    }

    #[test]
    fn test_chamfer_zero_samples() {
        let mut rng = StdRng::seed_from_u64(0);
        let res = chamfer_distance(&square(0.0), &square(0.0), 0, &mut rng);
        assert!(matches!(res, Err(IcpError::InvalidInput(_))));
    }
}
