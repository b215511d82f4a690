use glam::{DMat3, DMat4, DVec3};
use serde::{Deserialize, Serialize};
use surfalign_3d::{linalg::orthonormalize_with_consistent_handedness, transforms};

use crate::{matcher::Matches, pointcloud::DataPoints, IcpError};

/// Estimator of the transform increment from weighted correspondences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMinimizer {
    /// Rotation and translation.
    PointToPoint,
    /// Rotation, translation and uniform scale.
    #[default]
    PointToPointSimilarity,
}

impl ErrorMinimizer {
    /// Estimate the transform that moves the matched reading points onto the reference.
    ///
    /// # Arguments
    ///
    /// * `reading` - The reading cloud in its current pose.
    /// * `reference` - The reference cloud the matches point into.
    /// * `matches` - One match per reading point.
    /// * `weights` - One weight per match, zero for rejected matches.
    ///
    /// # Returns
    ///
    /// The homogeneous transform `p' = s * R * p + t` minimizing the weighted
    /// squared distances.
    pub fn compute(
        &self,
        reading: &DataPoints,
        reference: &DataPoints,
        matches: &Matches,
        weights: &[f64],
    ) -> Result<DMat4, IcpError> {
        let source = (0..reading.len())
            .map(|j| reading.point(j))
            .collect::<Vec<_>>();
        let target = matches
            .ids
            .iter()
            .map(|&id| reference.point(id))
            .collect::<Vec<_>>();
        self.fit(&source, &target, weights)
    }

    /// Weighted least squares fit between paired points.
    ///
    /// PRECONDITION: `source`, `target` and `weights` have the same length.
    pub fn fit(
        &self,
        source: &[DVec3],
        target: &[DVec3],
        weights: &[f64],
    ) -> Result<DMat4, IcpError> {
        assert_eq!(source.len(), target.len());
        assert_eq!(source.len(), weights.len());

        let total_weight = weights.iter().sum::<f64>();
        if total_weight <= 0.0 {
            return Err(IcpError::NoCorrespondences);
        }

        let mut mu_p = DVec3::ZERO;
        let mut mu_q = DVec3::ZERO;
        for ((p, q), w) in source.iter().zip(target).zip(weights) {
            mu_p += *w * *p;
            mu_q += *w * *q;
        }
        mu_p /= total_weight;
        mu_q /= total_weight;

        // cross covariance H = sum w (q - mu_q)(p - mu_p)^T and source variance
        let mut h = DMat3::ZERO;
        let mut var_p = 0.0;
        for ((p, q), &w) in source.iter().zip(target).zip(weights) {
            if w == 0.0 {
                continue;
            }
            let dp = *p - mu_p;
            let dq = *q - mu_q;
            h += DMat3::from_cols(dq * (w * dp.x), dq * (w * dp.y), dq * (w * dp.z));
            var_p += w * dp.length_squared();
        }

        if var_p <= f64::EPSILON * total_weight {
            log::warn!("Degenerate correspondences with zero spread, estimating translation only");
            return Ok(DMat4::from_translation(mu_q - mu_p));
        }

        let (rotation, _) = orthonormalize_with_consistent_handedness(&h);

        let scale = match self {
            ErrorMinimizer::PointToPoint => 1.0,
            ErrorMinimizer::PointToPointSimilarity => {
                let r_t_h = rotation.transpose() * h;
                (r_t_h.x_axis.x + r_t_h.y_axis.y + r_t_h.z_axis.z) / var_p
            }
        };

        let translation = mu_q - scale * (rotation * mu_p);
        Ok(transforms::similarity_transform(scale, &rotation, &translation))
    }
}
