use glam::{DMat3, DMat4, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use surfalign_3d::{
    linalg::orthonormalize_with_consistent_handedness,
    mesh::{RowMatrix, TriMesh},
    sampling::sample_mesh_surface,
    transforms::{linear_part, similarity_transform, translation_part},
};

use crate::{
    icp::Icp,
    input::{ensure_not_empty, mesh_from_matrices, rng_from_seed},
    pointcloud::DataPoints,
    IcpError,
};

/// Parameters of the similarity registration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityIcpParams {
    /// Number of points sampled on each surface.
    pub n_samples: usize,
    /// Maximum number of ICP iterations.
    pub max_iter: usize,
    /// Fraction of the closest correspondences kept every iteration.
    pub trim_ratio: f64,
    /// Seed of the random generator, drawn from the OS when unset.
    pub seed: Option<u64>,
}

impl Default for SimilarityIcpParams {
    fn default() -> Self {
        Self {
            n_samples: 20000,
            max_iter: 100,
            trim_ratio: 0.85,
            seed: None,
        }
    }
}

/// A similarity transform `p' = s * R * p + t` decomposed into its parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
    /// The rotation, always with determinant +1.
    pub rotation: DMat3,
    /// The translation.
    pub translation: DVec3,
    /// The uniform scale, negative when the estimate contained a reflection.
    pub scale: f64,
    /// The scale as a diagonal matrix `s * I`.
    pub scale_matrix: DMat3,
    /// The homogeneous transform, its linear block is exactly `s * R`.
    pub transform: DMat4,
}

impl SimilarityResult {
    /// Decompose a homogeneous similarity transform.
    ///
    /// The scale is the mean norm of the columns of the linear block. The
    /// rotation is the closest proper rotation to the scale normalized block; if
    /// that block is a reflection the sign is moved into the scale.
    pub fn from_transform(transform: &DMat4) -> Self {
        let linear = linear_part(transform);
        let translation = translation_part(transform);

        let scale =
            (linear.x_axis.length() + linear.y_axis.length() + linear.z_axis.length()) / 3.0;
        let normalized = if scale != 0.0 {
            linear / scale
        } else {
            log::warn!("Similarity transform with zero scale");
            linear
        };

        let (rotation, sign) = orthonormalize_with_consistent_handedness(&normalized);
        let scale = scale * sign;

        Self {
            rotation,
            translation,
            scale,
            scale_matrix: DMat3::from_diagonal(DVec3::splat(scale)),
            transform: similarity_transform(scale, &rotation, &translation),
        }
    }
}

/// Register mesh B onto mesh A with a similarity transform, using the given random source.
///
/// # Arguments
///
/// * `a` - The reference mesh.
/// * `b` - The mesh to move.
/// * `params` - Sampling and iteration parameters, `seed` is ignored.
/// * `rng` - Random source for surface sampling and subsampling.
///
/// # Returns
///
/// The transform mapping B onto A.
pub fn similarity_icp_with_rng<R: Rng + ?Sized>(
    a: &TriMesh,
    b: &TriMesh,
    params: &SimilarityIcpParams,
    rng: &mut R,
) -> Result<SimilarityResult, IcpError> {
    ensure_not_empty(a, b)?;

    let points_a = sample_mesh_surface(a, params.n_samples, rng)?;
    let points_b = sample_mesh_surface(b, params.n_samples, rng)?;

    let reference = DataPoints::from_points(&points_a);
    let reading = DataPoints::from_points(&points_b);

    let icp = Icp::similarity(params.trim_ratio, params.max_iter);
    let outcome = icp.compute(&reading, &reference, &DMat4::IDENTITY, rng)?;

    let result = SimilarityResult::from_transform(&outcome.transform);
    log::debug!(
        "Similarity ICP: scale {:.6}, {} iterations ({:?}), rmse {:.6e}",
        result.scale,
        outcome.num_iterations,
        outcome.stop_reason,
        outcome.rmse
    );

    Ok(result)
}

/// Register mesh B onto mesh A with a similarity transform.
///
/// The random generator is seeded from `params.seed`, or from the OS when unset.
pub fn similarity_icp_meshes(
    a: &TriMesh,
    b: &TriMesh,
    params: &SimilarityIcpParams,
) -> Result<SimilarityResult, IcpError> {
    let mut rng = rng_from_seed(params.seed);
    similarity_icp_with_rng(a, b, params, &mut rng)
}

/// Register mesh B onto mesh A given as raw vertex and face matrices.
///
/// # Arguments
///
/// * `va` - Vertices of A, N x 3.
/// * `fa` - Faces of A, M x 3.
/// * `vb` - Vertices of B, N x 3.
/// * `fb` - Faces of B, M x 3.
/// * `params` - Sampling and iteration parameters.
///
/// # Errors
///
/// [`IcpError::InvalidInput`] if a matrix does not have 3 columns or a mesh
/// has no vertex or no face.
///
/// Example:
///
/// ```no_run
/// use surfalign_3d::mesh::RowMatrix;
/// use surfalign_icp::{similarity_icp, SimilarityIcpParams};
///
/// let v = RowMatrix::from_rows(&[
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ]);
/// let f = RowMatrix::from_rows(&[[0u32, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]);
/// let result = similarity_icp(&v, &f, &v, &f, &SimilarityIcpParams::default()).unwrap();
/// println!("scale: {}", result.scale);
/// ```
pub fn similarity_icp(
    va: &RowMatrix<f64>,
    fa: &RowMatrix<u32>,
    vb: &RowMatrix<f64>,
    fb: &RowMatrix<u32>,
    params: &SimilarityIcpParams,
) -> Result<SimilarityResult, IcpError> {
    let a = mesh_from_matrices("A", va, fa)?;
    let b = mesh_from_matrices("B", vb, fb)?;
    similarity_icp_meshes(&a, &b, params)
}
