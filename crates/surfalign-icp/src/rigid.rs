use std::path::Path;

use faer::{prelude::SpSolver, Mat};
use glam::{DMat3, DMat4, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use surfalign_3d::{
    io::read_triangle_mesh,
    linalg::{orthonormalize_with_consistent_handedness, skew},
    mesh::{RowMatrix, TriMesh},
    sampling::sample_mesh_surface,
    spatial::TriangleTree,
    transforms::similarity_transform,
};

use crate::{
    input::{ensure_not_empty, mesh_from_matrices, rng_from_seed},
    IcpError,
};

/// Parameters of the rigid mesh registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidIcpParams {
    /// Number of points sampled on the moving mesh every iteration.
    pub num_samples: usize,
    /// Number of iterations.
    pub max_iters: usize,
    /// Seed of the random generator, drawn from the OS when unset.
    pub seed: Option<u64>,
}

impl Default for RigidIcpParams {
    fn default() -> Self {
        Self {
            num_samples: 2000,
            max_iters: 30,
            seed: None,
        }
    }
}

/// A rigid transform `p' = R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidResult {
    /// The rotation matrix.
    pub rotation: DMat3,
    /// The translation vector.
    pub translation: DVec3,
}

impl RigidResult {
    /// The homogeneous 4x4 matrix of the transform.
    pub fn transform(&self) -> DMat4 {
        similarity_transform(1.0, &self.rotation, &self.translation)
    }
}

// relative Tikhonov damping of the point-to-plane normal equations
const DAMPING: f64 = 1e-9;

/// One linearized point-to-plane step.
///
/// Finds the small motion moving every `source` point onto the tangent plane of
/// its closest `target` point with normal `normal`. The rotation part is
/// linearized around the centroid of the source points and projected back to a
/// proper rotation.
fn point_to_plane_step(
    source: &[DVec3],
    target: &[DVec3],
    normals: &[DVec3],
) -> Result<(DMat3, DVec3), IcpError> {
    let center = source.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / source.len() as f64;

    // accumulate J^T J and J^T r with J = [x x n, n] and r = (x - p) . n
    let mut jtj = [[0.0; 6]; 6];
    let mut jtr = [0.0; 6];
    for ((x, p), n) in source.iter().zip(target).zip(normals) {
        let xc = *x - center;
        let c = xc.cross(*n);
        let row = [c.x, c.y, c.z, n.x, n.y, n.z];
        let r = (*x - *p).dot(*n);
        for i in 0..6 {
            jtr[i] += row[i] * r;
            for j in 0..6 {
                jtj[i][j] += row[i] * row[j];
            }
        }
    }

    let trace = (0..6).map(|i| jtj[i][i]).sum::<f64>();
    let lambda = DAMPING * (trace / 6.0) + f64::MIN_POSITIVE;

    let a = Mat::<f64>::from_fn(6, 6, |i, j| jtj[i][j] + if i == j { lambda } else { 0.0 });
    let b = Mat::<f64>::from_fn(6, 1, |i, _| -jtr[i]);
    let xi = a.partial_piv_lu().solve(&b);

    let w = DVec3::new(xi.read(0, 0), xi.read(1, 0), xi.read(2, 0));
    let tau = DVec3::new(xi.read(3, 0), xi.read(4, 0), xi.read(5, 0));
    if !w.is_finite() || !tau.is_finite() {
        return Err(IcpError::Solver(
            "point-to-plane system has a non finite solution".to_string(),
        ));
    }

    let (rotation, _) = orthonormalize_with_consistent_handedness(&(DMat3::IDENTITY + skew(w)));
    // x -> R (x - c) + c + tau
    let translation = center - rotation * center + tau;

    Ok((rotation, translation))
}

/// Register mesh B onto mesh A with a rigid transform, using the given random source.
///
/// Every iteration samples points on the current pose of B, finds their exact
/// closest points and face normals on A, and applies one point-to-plane update.
///
/// # Arguments
///
/// * `a` - The fixed mesh.
/// * `b` - The mesh to move.
/// * `params` - Sampling and iteration parameters, `seed` is ignored.
/// * `rng` - Random source for the surface sampling.
///
/// # Returns
///
/// The rotation and translation mapping B onto A.
pub fn rigid_icp_with_rng<R: Rng + ?Sized>(
    a: &TriMesh,
    b: &TriMesh,
    params: &RigidIcpParams,
    rng: &mut R,
) -> Result<RigidResult, IcpError> {
    ensure_not_empty(a, b)?;

    let tree = TriangleTree::new(a);
    let normals_a = a.face_normals();

    let mut rotation = DMat3::IDENTITY;
    let mut translation = DVec3::ZERO;

    for iter in 0..params.max_iters {
        let now = std::time::Instant::now();

        let pose = similarity_transform(1.0, &rotation, &translation);
        let samples = sample_mesh_surface(&b.transformed(&pose), params.num_samples, rng)?;
        if samples.is_empty() {
            break;
        }

        let mut source = Vec::with_capacity(samples.len());
        let mut target = Vec::with_capacity(samples.len());
        let mut normals = Vec::with_capacity(samples.len());
        let mut sum_sq = 0.0;
        for s in &samples {
            let x = DVec3::from_array(*s);
            // the tree is never empty after ensure_not_empty
            let Some(closest) = tree.closest_point(x) else {
                continue;
            };
            source.push(x);
            target.push(closest.point);
            normals.push(normals_a[closest.face]);
            sum_sq += closest.squared_distance;
        }

        let (r_up, t_up) = point_to_plane_step(&source, &target, &normals)?;
        rotation = r_up * rotation;
        translation = r_up * translation + t_up;

        log::debug!(
            "Rigid iteration {}: rmse {:.6e}, elapsed {:?}",
            iter,
            (sum_sq / source.len() as f64).sqrt(),
            now.elapsed()
        );
    }

    Ok(RigidResult {
        rotation,
        translation,
    })
}

/// Register mesh B onto mesh A with a rigid transform.
///
/// The random generator is seeded from `params.seed`, or from the OS when unset.
pub fn rigid_icp_meshes(
    a: &TriMesh,
    b: &TriMesh,
    params: &RigidIcpParams,
) -> Result<RigidResult, IcpError> {
    let mut rng = rng_from_seed(params.seed);
    rigid_icp_with_rng(a, b, params, &mut rng)
}

/// Register mesh B onto mesh A given as raw vertex and face matrices.
///
/// # Errors
///
/// [`IcpError::InvalidInput`] if a vertex or face matrix does not have exactly
/// 3 columns. The check happens before any computation.
pub fn rigid_icp(
    va: &RowMatrix<f64>,
    fa: &RowMatrix<u32>,
    vb: &RowMatrix<f64>,
    fb: &RowMatrix<u32>,
    params: &RigidIcpParams,
) -> Result<RigidResult, IcpError> {
    let a = mesh_from_matrices("A", va, fa)?;
    let b = mesh_from_matrices("B", vb, fb)?;
    rigid_icp_meshes(&a, &b, params)
}

/// Load two meshes from disk and register B onto A with a rigid transform.
///
/// The format is chosen from the file extension.
///
/// # Errors
///
/// [`IcpError::FileRead`] with the offending path if a file cannot be read.
pub fn rigid_icp_from_paths(
    path_a: impl AsRef<Path>,
    path_b: impl AsRef<Path>,
    params: &RigidIcpParams,
) -> Result<RigidResult, IcpError> {
    let a = read_triangle_mesh(path_a)?;
    let b = read_triangle_mesh(path_b)?;
    rigid_icp_meshes(&a, &b, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfalign_3d::transforms::axis_angle_to_rotation_matrix;

    #[test]
    fn test_point_to_plane_step_pure_translation() -> Result<(), IcpError> {
        // points above three orthogonal planes through the origin
        let target = vec![
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::new(-1.0, 0.5, 0.0),
            DVec3::new(0.0, 1.0, 2.0),
            DVec3::new(0.0, -2.0, 1.0),
            DVec3::new(3.0, 0.0, 1.0),
            DVec3::new(-2.0, 0.0, -1.0),
        ];
        let normals = vec![
            DVec3::Z,
            DVec3::Z,
            DVec3::X,
            DVec3::X,
            DVec3::Y,
            DVec3::Y,
        ];
        let offset = DVec3::new(0.1, -0.2, 0.3);
        let source = target.iter().map(|p| *p + offset).collect::<Vec<_>>();

        let (r, t) = point_to_plane_step(&source, &target, &normals)?;
        assert!(r.abs_diff_eq(DMat3::IDENTITY, 1e-6));
        assert!(t.abs_diff_eq(-offset, 1e-6));
        Ok(())
    }

    #[test]
    fn test_point_to_plane_step_small_rotation() -> Result<(), Box<dyn std::error::Error>> {
        // sample a unit cube's walls with exact normals
        let truth = axis_angle_to_rotation_matrix(&DVec3::new(1.0, 2.0, 0.5), 1e-3)?;
        let mut target = Vec::new();
        let mut normals = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let (u, v) = (i as f64 / 4.0 - 0.5, j as f64 / 4.0 - 0.5);
                for (p, n) in [
                    (DVec3::new(0.5, u, v), DVec3::X),
                    (DVec3::new(u, 0.5, v), DVec3::Y),
                    (DVec3::new(u, v, 0.5), DVec3::Z),
                ] {
                    target.push(p);
                    normals.push(n);
                }
            }
        }
        let source = target.iter().map(|p| truth.transpose() * *p).collect::<Vec<_>>();

        let (r, t) = point_to_plane_step(&source, &target, &normals)?;
        assert!(r.abs_diff_eq(truth, 1e-5));
        assert!(t.length() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_params_defaults() {
        let params = RigidIcpParams::default();
        assert_eq!(params.num_samples, 2000);
        assert_eq!(params.max_iters, 30);
        assert_eq!(params.seed, None);
    }
}
