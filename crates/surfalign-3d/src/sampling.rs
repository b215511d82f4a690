use glam::DVec3;
use rand::Rng;

use crate::mesh::{MeshError, TriMesh};

/// Points sampled on a mesh surface together with the face each one was drawn from.
#[derive(Debug, Clone)]
pub struct SurfaceSamples {
    /// The sampled points.
    pub points: Vec<[f64; 3]>,
    /// Index of the face each point lies on.
    pub faces: Vec<usize>,
}

/// Cumulative distribution of the face areas.
///
/// The prefix sum is normalized by the total area so that the last entry is 1.
/// When the total area is zero the prefix sum is returned unnormalized.
pub fn area_cdf(areas: &[f64]) -> Vec<f64> {
    let mut cdf = Vec::with_capacity(areas.len());
    let mut acc = 0.0;
    for area in areas {
        acc += area;
        cdf.push(acc);
    }

    let total = acc;
    if total > 0.0 {
        cdf.iter_mut().for_each(|c| *c /= total);
    }

    cdf
}

/// Select a face by inverse transform sampling of the area distribution.
///
/// Returns the first face whose cumulative value is greater or equal than `u`.
#[inline]
fn select_face(cdf: &[f64], u: f64, degenerate: bool) -> usize {
    let idx = cdf.partition_point(|&c| c < u);
    if idx < cdf.len() {
        idx
    } else if degenerate {
        // all-zero distribution: fall back to the array order
        0
    } else {
        // rounding left the last entry marginally below 1
        cdf.len() - 1
    }
}

/// Uniform point on a triangle using the square root barycentric transform.
#[inline]
fn sample_triangle<R: Rng + ?Sized>(tri: &[DVec3; 3], rng: &mut R) -> DVec3 {
    let r1 = rng.random::<f64>().sqrt();
    let r2 = rng.random::<f64>();
    let [a, b, c] = *tri;
    (1.0 - r1) * a + r1 * ((1.0 - r2) * b + r2 * c)
}

/// Sample points uniformly by area on the surface of a triangle mesh.
///
/// Also returns the face index each sample lies on.
///
/// # Arguments
///
/// * `mesh` - The triangle mesh to sample.
/// * `num_samples` - The number of points to draw.
/// * `rng` - The random number generator driving the sampling.
pub fn sample_mesh_surface_indexed<R: Rng + ?Sized>(
    mesh: &TriMesh,
    num_samples: usize,
    rng: &mut R,
) -> Result<SurfaceSamples, MeshError> {
    mesh.ensure_not_empty()?;

    let areas = mesh.face_areas();
    let cdf = area_cdf(&areas);
    let degenerate = areas.iter().sum::<f64>() <= 0.0;
    if degenerate {
        log::warn!(
            "Mesh with {} faces has zero total area, sampling is not area uniform",
            mesh.num_faces()
        );
    }

    let mut points = Vec::with_capacity(num_samples);
    let mut faces = Vec::with_capacity(num_samples);

    for _ in 0..num_samples {
        let u = rng.random::<f64>();
        let face = select_face(&cdf, u, degenerate);
        let point = sample_triangle(&mesh.triangle(face), rng);
        points.push(point.to_array());
        faces.push(face);
    }

    Ok(SurfaceSamples { points, faces })
}

/// Sample points uniformly by area on the surface of a triangle mesh.
///
/// PRECONDITION: the mesh has at least one vertex and one face.
///
/// Example:
///
/// ```
/// use rand::SeedableRng;
/// use surfalign_3d::{mesh::TriMesh, sampling::sample_mesh_surface};
///
/// let mesh = TriMesh::new(
///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let points = sample_mesh_surface(&mesh, 100, &mut rng).unwrap();
/// assert_eq!(points.len(), 100);
/// ```
pub fn sample_mesh_surface<R: Rng + ?Sized>(
    mesh: &TriMesh,
    num_samples: usize,
    rng: &mut R,
) -> Result<Vec<[f64; 3]>, MeshError> {
    Ok(sample_mesh_surface_indexed(mesh, num_samples, rng)?.points)
}
