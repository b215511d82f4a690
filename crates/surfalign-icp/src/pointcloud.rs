use faer::{Mat, MatRef};
use glam::{DMat4, DVec3};
use surfalign_3d::mesh::RowMatrix;

use crate::IcpError;

/// A point cloud stored as the columns of a 4xK homogeneous matrix.
///
/// The last row is always one, so a 4x4 transform applies to all points with a
/// single matrix product.
#[derive(Debug, Clone)]
pub struct DataPoints {
    features: Mat<f64>,
}

impl DataPoints {
    /// Create a point cloud from a list of 3D points.
    ///
    /// Example:
    ///
    /// ```
    /// use surfalign_icp::pointcloud::DataPoints;
    ///
    /// let cloud = DataPoints::from_points(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    /// assert_eq!(cloud.len(), 2);
    /// assert_eq!(cloud.features().read(3, 1), 1.0);
    /// ```
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        let features = Mat::from_fn(4, points.len(), |i, j| if i < 3 { points[j][i] } else { 1.0 });
        Self { features }
    }

    /// Create a point cloud from an N x 3 row-major matrix.
    ///
    /// # Errors
    ///
    /// Returns [`IcpError::InvalidInput`] if the matrix does not have 3 columns.
    pub fn from_matrix(points: &RowMatrix<f64>) -> Result<Self, IcpError> {
        if points.cols() != 3 {
            return Err(IcpError::InvalidInput(format!(
                "points must have 3 columns, got {}",
                points.cols()
            )));
        }
        let features = Mat::from_fn(4, points.rows(), |i, j| {
            if i < 3 {
                points.row(j)[i]
            } else {
                1.0
            }
        });
        Ok(Self { features })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.features.ncols()
    }

    /// Check if the cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The point stored in column `j`.
    #[inline]
    pub fn point(&self, j: usize) -> DVec3 {
        DVec3::new(
            self.features.read(0, j),
            self.features.read(1, j),
            self.features.read(2, j),
        )
    }

    /// Copy the points out as a list of arrays.
    pub fn to_points(&self) -> Vec<[f64; 3]> {
        (0..self.len()).map(|j| self.point(j).to_array()).collect()
    }

    /// The 4xK homogeneous matrix.
    pub fn features(&self) -> MatRef<'_, f64> {
        self.features.as_ref()
    }

    /// Apply a homogeneous transform to every point.
    pub fn transformed(&self, transform: &DMat4) -> Self {
        let t = Mat::from_fn(4, 4, |i, j| transform.col(j)[i]);
        Self {
            features: &t * &self.features,
        }
    }

    /// Mean of the points, zero for an empty cloud.
    pub fn centroid(&self) -> DVec3 {
        if self.is_empty() {
            return DVec3::ZERO;
        }
        let sum = (0..self.len()).fold(DVec3::ZERO, |acc, j| acc + self.point(j));
        sum / self.len() as f64
    }

    /// Keep only the points at the given column indices, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let features = Mat::from_fn(4, indices.len(), |i, j| self.features.read(i, indices[j]));
        Self { features }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_homogeneous() {
        let cloud = DataPoints::from_points(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(cloud.features().nrows(), 4);
        assert_eq!(cloud.features().ncols(), 2);
        for j in 0..2 {
            assert_eq!(cloud.features().read(3, j), 1.0);
        }
        assert_eq!(cloud.point(1), DVec3::new(4.0, 5.0, 6.0));
        assert_eq!(cloud.to_points(), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_from_matrix_checks_columns() -> Result<(), Box<dyn std::error::Error>> {
        let good = RowMatrix::from_rows(&[[0.0, 1.0, 2.0]]);
        assert_eq!(DataPoints::from_matrix(&good)?.len(), 1);

        let bad = RowMatrix::from_shape_vec([2, 2], vec![0.0, 1.0, 2.0, 3.0])?;
        assert!(matches!(
            DataPoints::from_matrix(&bad),
            Err(IcpError::InvalidInput(_))
        ));
        Ok(())
    }

    #[test]
    fn test_empty_cloud() {
        let cloud = DataPoints::from_points(&[]);
        assert!(cloud.is_empty());
        assert_eq!(cloud.centroid(), DVec3::ZERO);
    }

    #[test]
    fn test_transformed_and_centroid() {
        let cloud = DataPoints::from_points(&[[1.0, 0.0, 0.0], [3.0, 2.0, 0.0]]);
        let t = DMat4::from_scale_rotation_translation(
            DVec3::splat(2.0),
            glam::DQuat::IDENTITY,
            DVec3::new(0.0, 0.0, 1.0),
        );
        let moved = cloud.transformed(&t);
        assert_eq!(moved.point(0), DVec3::new(2.0, 0.0, 1.0));
        assert_eq!(moved.features().read(3, 1), 1.0);

        let c = moved.centroid();
        assert_relative_eq!(c.x, 4.0);
        assert_relative_eq!(c.y, 2.0);
        assert_relative_eq!(c.z, 1.0);
    }

    #[test]
    fn test_select() {
        let cloud = DataPoints::from_points(&[[0.0; 3], [1.0; 3], [2.0; 3]]);
        let sub = cloud.select(&[2, 0]);
        assert_eq!(sub.to_points(), vec![[2.0; 3], [0.0; 3]]);
    }
}
